//! Authorization module - permission resolution and route enforcement
//!
//! This module implements the two-layer staff authorization model:
//! - Role-based bypass for root/admin accounts
//! - Position permissions with per-staff grant/revoke overrides
//! - Configurable enforcement modes (off/advisory/strict)

pub mod catalog;
mod evaluator;
mod principal;
mod resolver;
mod store;

pub use evaluator::{PolicyEvaluator, StaffPolicyEvaluator};
pub use principal::{Principal, Role};
pub use resolver::{
    resolve, EffectivePermissions, PermissionResolver, PositionGrants, StaffRecord, StaffSubject,
};
pub use store::{PermissionStore, SqlitePermissionStore};

use crate::app::AppState;
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;

/// Authorization enforcement mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthzMode {
    /// No permission checks (development mode)
    Off,
    /// Log denials but allow requests (testing mode)
    Advisory,
    /// Enforce 403 on denied requests (production mode)
    #[default]
    Strict,
}

impl AuthzMode {
    pub fn from_env() -> Self {
        Self::parse(&std::env::var("AUTHZ_MODE").unwrap_or_default())
    }

    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "off" => AuthzMode::Off,
            "advisory" => AuthzMode::Advisory,
            _ => AuthzMode::Strict,
        }
    }
}

/// Well-known permission names
pub mod permissions {
    // Hotels
    pub const VIEW_HOTELS: &str = "view_hotels";
    pub const MANAGE_HOTELS: &str = "manage_hotels";

    // Room types
    pub const VIEW_ROOM_TYPES: &str = "view_room_types";
    pub const MANAGE_ROOM_TYPES: &str = "manage_room_types";

    // Rooms
    pub const VIEW_ROOMS: &str = "view_rooms";
    pub const MANAGE_ROOMS: &str = "manage_rooms";
    pub const UPDATE_ROOM_STATUS: &str = "update_room_status";

    // Staff
    pub const VIEW_STAFF: &str = "view_staff";
    pub const MANAGE_STAFF: &str = "manage_staff";
    pub const MANAGE_DEPARTMENTS: &str = "manage_departments";
    pub const MANAGE_POSITIONS: &str = "manage_positions";
    pub const MANAGE_PERMISSIONS: &str = "manage_permissions";

    // Bookings
    pub const VIEW_BOOKINGS: &str = "view_bookings";
    pub const MANAGE_BOOKINGS: &str = "manage_bookings";
    pub const CHECK_IN_OUT: &str = "check_in_out";
}

/// Gate a handler on `permission` according to the configured mode.
pub async fn authorize(state: &AppState, auth: &AuthUser, permission: &str) -> AppResult<()> {
    if state.authz_mode == AuthzMode::Off {
        return Ok(());
    }

    let principal = auth.principal();
    if state.evaluator.can(&principal, permission).await? {
        return Ok(());
    }

    match state.authz_mode {
        AuthzMode::Advisory => {
            tracing::warn!(
                user_id = principal.user_id,
                permission = %permission,
                "permission denied (advisory mode, request allowed)"
            );
            Ok(())
        }
        _ => Err(AppError::forbidden(format!("missing permission: {permission}"))),
    }
}
