use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::permission::Permission;

// =============================================================================
// STAFF PERMISSION OVERRIDE
// =============================================================================

/// One explicit per-staff rule, keyed by (staff_id, permission_id).
///
/// A row with `granted = false` is not the same as no row: it keeps
/// suppressing the permission even if the position's base set changes later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StaffPermission {
    pub staff_id: i64,
    pub permission_id: i64,
    pub granted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbStaffPermission {
    pub staff_id: i64,
    pub permission_id: i64,
    pub granted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DbStaffPermission> for StaffPermission {
    fn from(db: DbStaffPermission) -> Self {
        StaffPermission {
            staff_id: db.staff_id,
            permission_id: db.permission_id,
            granted: db.granted,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GrantPermissionRequest {
    #[schema(example = 9)]
    pub permission_id: i64,
}

/// An override row joined with the permission it refers to, as consumed by
/// the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PermissionOverride {
    pub permission: Permission,
    pub granted: bool,
}

impl PermissionOverride {
    pub fn grant(permission: Permission) -> Self {
        Self { permission, granted: true }
    }

    pub fn revoke(permission: Permission) -> Self {
        Self { permission, granted: false }
    }
}
