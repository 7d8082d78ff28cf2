use async_trait::async_trait;
use sqlx::{FromRow, SqliteConnection, SqlitePool};

use super::resolver::{PositionGrants, StaffRecord, StaffSubject};
use crate::db::single_row;
use crate::errors::{AppError, AppResult};
use crate::models::permission::{DbPermission, Permission, PERMISSION_COLUMNS};
use crate::models::staff_permission::{DbStaffPermission, PermissionOverride, StaffPermission};
use crate::utils::utc_now;

/// Storage the resolver reads staff, positions and overrides from.
#[async_trait]
pub trait PermissionStore: Send + Sync {
    async fn load_staff(&self, staff_id: i64) -> AppResult<StaffRecord>;

    async fn load_position(&self, position_id: i64) -> AppResult<PositionGrants>;

    async fn load_overrides(&self, staff_id: i64) -> AppResult<Vec<PermissionOverride>>;

    /// Insert or overwrite the (staff, permission) override in one atomic step.
    async fn upsert_override(
        &self,
        staff_id: i64,
        permission_id: i64,
        granted: bool,
    ) -> AppResult<StaffPermission>;

    async fn load_permission(&self, permission_id: i64) -> AppResult<Permission>;

    /// Staff, base set and overrides together. Stores that can read a
    /// consistent snapshot should override this.
    async fn load_subject(&self, staff_id: i64) -> AppResult<StaffSubject> {
        let staff = self.load_staff(staff_id).await?;
        let base = match staff.position_id {
            Some(position_id) => self.load_position(position_id).await?.permissions,
            None => Vec::new(),
        };
        let overrides = self.load_overrides(staff_id).await?;

        Ok(StaffSubject {
            staff,
            base,
            overrides,
        })
    }
}

#[derive(Debug, Clone)]
pub struct SqlitePermissionStore {
    pool: SqlitePool,
}

impl SqlitePermissionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Load a staff subject on a connection the caller controls, so the read
    /// can share a transaction with other queries.
    pub async fn read_subject(conn: &mut SqliteConnection, staff_id: i64) -> AppResult<StaffSubject> {
        let staff = fetch_staff(conn, staff_id).await?;
        let base = match staff.position_id {
            Some(position_id) => fetch_position(conn, position_id).await?.permissions,
            None => Vec::new(),
        };
        let overrides = fetch_overrides(conn, staff_id).await?;

        Ok(StaffSubject {
            staff,
            base,
            overrides,
        })
    }
}

#[derive(Debug, FromRow)]
struct OverrideRow {
    #[sqlx(flatten)]
    permission: DbPermission,
    granted: bool,
}

async fn fetch_staff(conn: &mut SqliteConnection, staff_id: i64) -> AppResult<StaffRecord> {
    let (staff_id, hotel_id, position_id) = sqlx::query_as::<_, (i64, i64, Option<i64>)>(
        "SELECT staff_id, hotel_id, position_id FROM staff WHERE staff_id = ?",
    )
    .bind(staff_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::not_found(format!("staff {staff_id} not found")))?;

    Ok(StaffRecord {
        staff_id,
        hotel_id,
        position_id,
    })
}

async fn fetch_position(conn: &mut SqliteConnection, position_id: i64) -> AppResult<PositionGrants> {
    let (position_id, hotel_id) = sqlx::query_as::<_, (i64, Option<i64>)>(
        "SELECT position_id, hotel_id FROM positions WHERE position_id = ?",
    )
    .bind(position_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::not_found(format!("position {position_id} not found")))?;

    let permissions = sqlx::query_as::<_, DbPermission>(
        r#"
        SELECT p.permission_id, p.name, p.display_name, p.description, p.module, p.created_at, p.updated_at
        FROM permissions p
        INNER JOIN position_permissions pp ON pp.permission_id = p.permission_id
        WHERE pp.position_id = ?
        ORDER BY p.permission_id
        "#,
    )
    .bind(position_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(PositionGrants {
        position_id,
        hotel_id,
        permissions: permissions.into_iter().map(Permission::from).collect(),
    })
}

async fn fetch_overrides(
    conn: &mut SqliteConnection,
    staff_id: i64,
) -> AppResult<Vec<PermissionOverride>> {
    let rows = sqlx::query_as::<_, OverrideRow>(
        r#"
        SELECT p.permission_id, p.name, p.display_name, p.description, p.module, p.created_at, p.updated_at, sp.granted
        FROM staff_permissions sp
        INNER JOIN permissions p ON p.permission_id = sp.permission_id
        WHERE sp.staff_id = ?
        ORDER BY p.permission_id
        "#,
    )
    .bind(staff_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| PermissionOverride {
            permission: row.permission.into(),
            granted: row.granted,
        })
        .collect())
}

#[async_trait]
impl PermissionStore for SqlitePermissionStore {
    async fn load_staff(&self, staff_id: i64) -> AppResult<StaffRecord> {
        let mut conn = self.pool.acquire().await?;
        fetch_staff(&mut conn, staff_id).await
    }

    async fn load_position(&self, position_id: i64) -> AppResult<PositionGrants> {
        let mut conn = self.pool.acquire().await?;
        fetch_position(&mut conn, position_id).await
    }

    async fn load_overrides(&self, staff_id: i64) -> AppResult<Vec<PermissionOverride>> {
        let mut conn = self.pool.acquire().await?;
        fetch_overrides(&mut conn, staff_id).await
    }

    async fn upsert_override(
        &self,
        staff_id: i64,
        permission_id: i64,
        granted: bool,
    ) -> AppResult<StaffPermission> {
        let now = utc_now();

        let row = sqlx::query_as::<_, DbStaffPermission>(
            r#"
            INSERT INTO staff_permissions (staff_id, permission_id, granted, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (staff_id, permission_id)
            DO UPDATE SET granted = excluded.granted, updated_at = excluded.updated_at
            RETURNING staff_id, permission_id, granted, created_at, updated_at
            "#,
        )
        .bind(staff_id)
        .bind(permission_id)
        .bind(granted)
        .bind(now)
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .and_then(single_row)
        .map_err(|err| AppError::from_write(err, "staff permission override"))?;

        Ok(row.into())
    }

    async fn load_permission(&self, permission_id: i64) -> AppResult<Permission> {
        let sql = format!("SELECT {PERMISSION_COLUMNS} FROM permissions WHERE permission_id = ?");
        sqlx::query_as::<_, DbPermission>(&sql)
            .bind(permission_id)
            .fetch_optional(&self.pool)
            .await?
            .map(Permission::from)
            .ok_or_else(|| AppError::not_found(format!("permission {permission_id} not found")))
    }

    async fn load_subject(&self, staff_id: i64) -> AppResult<StaffSubject> {
        let mut tx = self.pool.begin().await?;
        let subject = Self::read_subject(&mut tx, staff_id).await?;
        tx.commit().await?;
        Ok(subject)
    }
}
