use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use super::staff_permission::StaffPermission;

// =============================================================================
// PERMISSION
// =============================================================================

/// A named capability from the catalog. `name` is the stable identifier used
/// by authorization checks; `display_name` and `description` are metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Permission {
    pub permission_id: i64,
    #[schema(example = "manage_rooms")]
    pub name: String,
    #[schema(example = "Manage rooms")]
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "rooms")]
    pub module: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbPermission {
    pub permission_id: i64,
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub module: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DbPermission> for Permission {
    fn from(db: DbPermission) -> Self {
        Permission {
            permission_id: db.permission_id,
            name: db.name,
            display_name: db.display_name,
            description: db.description,
            module: db.module,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

pub const PERMISSION_COLUMNS: &str =
    "permission_id, name, display_name, description, module, created_at, updated_at";

#[derive(Debug, Deserialize, ToSchema)]
pub struct PermissionCreateRequest {
    #[schema(example = "manage_minibar")]
    pub name: String,
    #[schema(example = "Manage minibar")]
    pub display_name: String,
    #[schema(example = "Restock and price minibar items")]
    pub description: Option<String>,
    #[schema(example = "rooms")]
    pub module: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PermissionUpdateRequest {
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub module: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PermissionFilter {
    /// Only return permissions tagged with this module
    pub module: Option<String>,
}

/// A permission together with everything that references it.
#[derive(Debug, Serialize, ToSchema)]
pub struct PermissionDetail {
    #[serde(flatten)]
    pub permission: Permission,
    pub position_ids: Vec<i64>,
    pub staff_overrides: Vec<StaffPermission>,
}

// =============================================================================
// CHECK RESULTS
// =============================================================================

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PermissionCheck {
    #[schema(example = "manage_rooms")]
    pub permission: String,
    pub granted: bool,
}
