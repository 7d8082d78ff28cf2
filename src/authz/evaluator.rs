use async_trait::async_trait;

use super::principal::Principal;
use super::resolver::PermissionResolver;
use super::store::PermissionStore;
use crate::errors::AppResult;

/// Policy evaluator trait for pluggable authorization logic
#[async_trait]
pub trait PolicyEvaluator: Send + Sync {
    /// Check if the principal holds a permission
    async fn can(&self, principal: &Principal, permission: &str) -> AppResult<bool>;
}

/// Evaluates requests against the staff permission resolver.
///
/// Evaluation order:
/// 1. root/admin role -> allow
/// 2. linked staff record whose effective set contains the permission -> allow
/// 3. deny
#[derive(Debug, Clone)]
pub struct StaffPolicyEvaluator<S> {
    resolver: PermissionResolver<S>,
}

impl<S: PermissionStore> StaffPolicyEvaluator<S> {
    pub fn new(resolver: PermissionResolver<S>) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl<S: PermissionStore> PolicyEvaluator for StaffPolicyEvaluator<S> {
    async fn can(&self, principal: &Principal, permission: &str) -> AppResult<bool> {
        if principal.is_administrative() {
            tracing::debug!(
                user_id = principal.user_id,
                role = principal.role.as_str(),
                permission = %permission,
                "administrative bypass"
            );
            return Ok(true);
        }

        let Some(staff_id) = principal.staff_id else {
            tracing::debug!(
                user_id = principal.user_id,
                permission = %permission,
                "no staff record linked, permission denied"
            );
            return Ok(false);
        };

        let allowed = match self.resolver.has_permission(staff_id, permission).await {
            Ok(allowed) => allowed,
            // the token outlived its staff record
            Err(err) if err.is_not_found() => false,
            Err(err) => return Err(err),
        };

        tracing::debug!(
            user_id = principal.user_id,
            staff_id,
            permission = %permission,
            allowed,
            "staff permission evaluated"
        );

        Ok(allowed)
    }
}
