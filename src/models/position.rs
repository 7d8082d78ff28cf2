use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use super::permission::Permission;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Position {
    pub position_id: i64,
    /// `None` means the position applies to every hotel
    pub hotel_id: Option<i64>,
    #[schema(example = "HK-MGR")]
    pub code: Option<String>,
    #[schema(example = "Housekeeping Manager")]
    pub name: String,
    pub description: Option<String>,
    /// 1 is the most senior, 10 the most junior
    #[schema(example = 3)]
    pub level: Option<i64>,
    #[schema(example = 1)]
    pub status: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbPosition {
    pub position_id: i64,
    pub hotel_id: Option<i64>,
    pub code: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub level: Option<i64>,
    pub status: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DbPosition> for Position {
    fn from(db: DbPosition) -> Self {
        Position {
            position_id: db.position_id,
            hotel_id: db.hotel_id,
            code: db.code,
            name: db.name,
            description: db.description,
            level: db.level,
            status: db.status,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

pub const POSITION_COLUMNS: &str =
    "position_id, hotel_id, code, name, description, level, status, created_at, updated_at";

#[derive(Debug, Serialize, ToSchema)]
pub struct PositionWithPermissions {
    #[serde(flatten)]
    pub position: Position,
    pub permissions: Vec<Permission>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PositionCreateRequest {
    pub hotel_id: Option<i64>,
    #[schema(example = "HK-MGR")]
    pub code: Option<String>,
    #[schema(example = "Housekeeping Manager")]
    pub name: String,
    pub description: Option<String>,
    #[schema(example = 3)]
    pub level: Option<i64>,
    #[schema(example = 1)]
    pub status: Option<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PositionUpdateRequest {
    /// Absent keeps the current scope, `null` makes the position global
    #[serde(default, deserialize_with = "crate::utils::double_option")]
    #[schema(value_type = Option<i64>)]
    pub hotel_id: Option<Option<i64>>,
    #[serde(default, deserialize_with = "crate::utils::double_option")]
    #[schema(value_type = Option<String>)]
    pub code: Option<Option<String>>,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "crate::utils::double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::utils::double_option")]
    #[schema(value_type = Option<i64>)]
    pub level: Option<Option<i64>>,
    pub status: Option<i64>,
}

/// Replaces the base permission set of a position.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignPositionPermissionsRequest {
    #[schema(example = json!([6, 7]))]
    pub permission_ids: Vec<i64>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PositionFilter {
    /// Positions of this hotel plus the global ones
    pub hotel_id: Option<i64>,
    pub status: Option<i64>,
}
