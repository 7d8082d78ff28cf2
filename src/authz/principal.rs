use serde::{Deserialize, Serialize};

/// Account role carried in the access token. This is the coarse, route-level
/// layer; fine-grained capabilities come from the staff permission resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Root,
    Admin,
    Staff,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Root => "root",
            Role::Admin => "admin",
            Role::Staff => "staff",
        }
    }

    /// Root and admin accounts bypass permission checks.
    pub fn is_administrative(&self) -> bool {
        matches!(self, Role::Root | Role::Admin)
    }
}

/// The authenticated caller as seen by authorization checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i64,
    pub role: Role,
    /// Staff record linked to the account, if any
    pub staff_id: Option<i64>,
}

impl Principal {
    pub fn new(user_id: i64, role: Role) -> Self {
        Self {
            user_id,
            role,
            staff_id: None,
        }
    }

    pub fn with_staff(mut self, staff_id: i64) -> Self {
        self.staff_id = Some(staff_id);
        self
    }

    pub fn is_administrative(&self) -> bool {
        self.role.is_administrative()
    }
}
