mod common;

use anyhow::Result;

use hotel_backoffice::authz::catalog;

#[tokio::test]
async fn seeding_twice_keeps_ids_and_count() -> Result<()> {
    let (_dir, pool) = common::test_pool().await?;

    assert_eq!(catalog::seed(&pool).await?, 15);
    let first_id = common::permission_id(&pool, "manage_rooms").await?;

    // a renamed display name is restored on re-seed
    sqlx::query("UPDATE permissions SET display_name = 'Rooms!' WHERE name = 'manage_rooms'")
        .execute(&pool)
        .await?;

    catalog::seed(&pool).await?;

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM permissions").fetch_one(&pool).await?;
    assert_eq!(count, 15);
    assert_eq!(common::permission_id(&pool, "manage_rooms").await?, first_id);

    let display: String =
        sqlx::query_scalar("SELECT display_name FROM permissions WHERE name = 'manage_rooms'")
            .fetch_one(&pool)
            .await?;
    assert_eq!(display, "Manage rooms");

    Ok(())
}

#[tokio::test]
async fn seed_does_not_touch_custom_permissions() -> Result<()> {
    let (_dir, pool) = common::test_pool().await?;

    sqlx::query(
        "INSERT INTO permissions (name, display_name, module, created_at, updated_at) VALUES ('manage_minibar', 'Manage minibar', 'rooms', datetime('now'), datetime('now'))",
    )
    .execute(&pool)
    .await?;

    catalog::seed(&pool).await?;

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM permissions").fetch_one(&pool).await?;
    assert_eq!(count, 16);

    Ok(())
}
