mod common;

use anyhow::Result;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Connection, SqliteConnection, SqlitePool};

use hotel_backoffice::authz::{catalog, PermissionResolver, SqlitePermissionStore};
use hotel_backoffice::errors::AppError;

async fn insert_position(pool: &SqlitePool, name: &str, permissions: &[&str]) -> Result<i64> {
    let position_id = sqlx::query(
        "INSERT INTO positions (name, status, created_at, updated_at) VALUES (?, 1, datetime('now'), datetime('now'))",
    )
    .bind(name)
    .execute(pool)
    .await?
    .last_insert_rowid();

    for permission in permissions {
        sqlx::query(
            "INSERT INTO position_permissions (position_id, permission_id) SELECT ?, permission_id FROM permissions WHERE name = ?",
        )
        .bind(position_id)
        .bind(permission)
        .execute(pool)
        .await?;
    }

    Ok(position_id)
}

async fn insert_staff(pool: &SqlitePool, hotel_id: i64, position_id: Option<i64>) -> Result<i64> {
    let staff_id = sqlx::query(
        "INSERT INTO staff (hotel_id, position_id, full_name, status, created_at, updated_at) VALUES (?, ?, 'Vo F', 1, datetime('now'), datetime('now'))",
    )
    .bind(hotel_id)
    .bind(position_id)
    .execute(pool)
    .await?
    .last_insert_rowid();
    Ok(staff_id)
}

async fn override_rows(pool: &SqlitePool, staff_id: i64) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM staff_permissions WHERE staff_id = ?")
        .bind(staff_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

#[tokio::test]
async fn effective_set_is_base_plus_grants_minus_revokes() -> Result<()> {
    let (_dir, pool) = common::test_pool().await?;
    catalog::seed(&pool).await?;
    let hotel_id = common::insert_hotel(&pool, "Riverside").await?;
    let position_id = insert_position(&pool, "Housekeeping", &["view_rooms", "update_room_status"]).await?;
    let staff_id = insert_staff(&pool, hotel_id, Some(position_id)).await?;

    let resolver = PermissionResolver::new(SqlitePermissionStore::new(pool.clone()));
    let manage_rooms = common::permission_id(&pool, "manage_rooms").await?;
    let update_room_status = common::permission_id(&pool, "update_room_status").await?;

    resolver.grant(staff_id, manage_rooms).await?;
    resolver.revoke(staff_id, update_room_status).await?;

    let effective = resolver.effective_permissions(staff_id).await?;
    assert_eq!(effective.names(), vec!["manage_rooms", "view_rooms"]);
    assert!(!resolver.has_permission(staff_id, "update_room_status").await?);
    assert!(resolver.position_has_permission(position_id, "update_room_status").await?);

    // has_permission agrees with the set for every catalog entry
    for entry in catalog::DEFAULT_PERMISSIONS {
        assert_eq!(
            resolver.has_permission(staff_id, entry.name).await?,
            effective.contains_name(entry.name),
            "disagreement on {}",
            entry.name
        );
    }

    Ok(())
}

#[tokio::test]
async fn grant_to_a_missing_permission_writes_nothing() -> Result<()> {
    let (_dir, pool) = common::test_pool().await?;
    let hotel_id = common::insert_hotel(&pool, "Riverside").await?;
    let staff_id = insert_staff(&pool, hotel_id, None).await?;
    let resolver = PermissionResolver::new(SqlitePermissionStore::new(pool.clone()));

    let err = resolver.grant(staff_id, 999).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "unexpected error: {err:?}");

    let err = resolver.revoke(999, 1).await.unwrap_err();
    assert!(err.is_not_found());

    assert_eq!(override_rows(&pool, staff_id).await?, 0);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_grants_leave_one_granted_row() -> Result<()> {
    let (_dir, pool) = common::test_pool().await?;
    catalog::seed(&pool).await?;
    let hotel_id = common::insert_hotel(&pool, "Riverside").await?;
    let staff_id = insert_staff(&pool, hotel_id, None).await?;
    let manage_staff = common::permission_id(&pool, "manage_staff").await?;

    let resolver = PermissionResolver::new(SqlitePermissionStore::new(pool.clone()));
    let (a, b) = tokio::join!(
        resolver.grant(staff_id, manage_staff),
        resolver.grant(staff_id, manage_staff)
    );
    assert!(a?.granted);
    assert!(b?.granted);

    assert_eq!(override_rows(&pool, staff_id).await?, 1);
    assert_eq!(resolver.effective_permissions(staff_id).await?.names(), vec!["manage_staff"]);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_overrides_leave_one_row() -> Result<()> {
    let (_dir, pool) = common::test_pool().await?;
    catalog::seed(&pool).await?;
    let hotel_id = common::insert_hotel(&pool, "Riverside").await?;
    let staff_id = insert_staff(&pool, hotel_id, None).await?;
    let manage_rooms = common::permission_id(&pool, "manage_rooms").await?;

    let resolver = PermissionResolver::new(SqlitePermissionStore::new(pool.clone()));

    let mut handles = Vec::new();
    for i in 0..8 {
        let resolver = resolver.clone();
        handles.push(tokio::spawn(async move {
            if i % 2 == 0 {
                resolver.grant(staff_id, manage_rooms).await
            } else {
                resolver.revoke(staff_id, manage_rooms).await
            }
        }));
    }
    for handle in handles {
        handle.await??;
    }

    assert_eq!(override_rows(&pool, staff_id).await?, 1);

    // whichever write landed last decides
    let granted: bool = sqlx::query_scalar(
        "SELECT granted FROM staff_permissions WHERE staff_id = ? AND permission_id = ?",
    )
    .bind(staff_id)
    .bind(manage_rooms)
    .fetch_one(&pool)
    .await?;
    assert_eq!(resolver.has_permission(staff_id, "manage_rooms").await?, granted);

    Ok(())
}

#[tokio::test]
async fn override_writes_are_visible_to_other_connections() -> Result<()> {
    let (dir, pool) = common::test_pool().await?;
    catalog::seed(&pool).await?;
    let hotel_id = common::insert_hotel(&pool, "Riverside").await?;
    let staff_id = insert_staff(&pool, hotel_id, None).await?;
    let manage_rooms = common::permission_id(&pool, "manage_rooms").await?;
    let resolver = PermissionResolver::new(SqlitePermissionStore::new(pool.clone()));

    let opts = SqliteConnectOptions::new().filename(dir.path().join("test.db"));
    let mut other = SqliteConnection::connect_with(&opts).await?;

    for round in 0..200 {
        let expected = round % 2 == 0;
        let row = if expected {
            resolver.grant(staff_id, manage_rooms).await?
        } else {
            resolver.revoke(staff_id, manage_rooms).await?
        };
        assert_eq!(row.granted, expected);

        let stored: bool = sqlx::query_scalar(
            "SELECT granted FROM staff_permissions WHERE staff_id = ? AND permission_id = ?",
        )
        .bind(staff_id)
        .bind(manage_rooms)
        .fetch_one(&mut other)
        .await?;
        assert_eq!(stored, expected, "stale read in round {}", round);
    }

    other.close().await?;
    Ok(())
}

#[tokio::test]
async fn deleted_permission_disappears_from_every_set() -> Result<()> {
    let (_dir, pool) = common::test_pool().await?;
    catalog::seed(&pool).await?;
    let hotel_id = common::insert_hotel(&pool, "Riverside").await?;
    let position_id = insert_position(&pool, "Front Desk", &["check_in_out", "view_bookings"]).await?;
    let staff_id = insert_staff(&pool, hotel_id, Some(position_id)).await?;
    let resolver = PermissionResolver::new(SqlitePermissionStore::new(pool.clone()));

    let manage_bookings = common::permission_id(&pool, "manage_bookings").await?;
    resolver.grant(staff_id, manage_bookings).await?;

    sqlx::query("DELETE FROM permissions WHERE name IN ('check_in_out', 'manage_bookings')")
        .execute(&pool)
        .await?;

    assert_eq!(resolver.effective_permissions(staff_id).await?.names(), vec!["view_bookings"]);
    assert_eq!(override_rows(&pool, staff_id).await?, 0);

    Ok(())
}

#[tokio::test]
async fn overrides_outlive_position_changes() -> Result<()> {
    let (_dir, pool) = common::test_pool().await?;
    catalog::seed(&pool).await?;
    let hotel_id = common::insert_hotel(&pool, "Riverside").await?;
    let first = insert_position(&pool, "Housekeeping", &["view_rooms"]).await?;
    let second = insert_position(&pool, "Supervisor", &["view_rooms", "manage_rooms"]).await?;
    let staff_id = insert_staff(&pool, hotel_id, Some(first)).await?;
    let resolver = PermissionResolver::new(SqlitePermissionStore::new(pool.clone()));

    let view_rooms = common::permission_id(&pool, "view_rooms").await?;
    resolver.revoke(staff_id, view_rooms).await?;

    sqlx::query("UPDATE staff SET position_id = ? WHERE staff_id = ?")
        .bind(second)
        .bind(staff_id)
        .execute(&pool)
        .await?;

    assert_eq!(resolver.effective_permissions(staff_id).await?.names(), vec!["manage_rooms"]);

    Ok(())
}
