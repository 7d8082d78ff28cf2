//! Staff permission resolution.
//!
//! A staff member's effective permissions are the base set of their position
//! with their personal overrides applied on top. For any permission the rule
//! is: an override row decides by its `granted` flag, otherwise base
//! membership decides.

use std::collections::BTreeMap;

use serde::Serialize;

use super::store::PermissionStore;
use crate::errors::{AppError, AppResult};
use crate::models::permission::Permission;
use crate::models::staff_permission::{PermissionOverride, StaffPermission};

/// The parts of a staff record the resolver needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StaffRecord {
    pub staff_id: i64,
    pub hotel_id: i64,
    pub position_id: Option<i64>,
}

/// A position with its base permission set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionGrants {
    pub position_id: i64,
    pub hotel_id: Option<i64>,
    pub permissions: Vec<Permission>,
}

impl PositionGrants {
    /// Membership test against the base set only; there is no override layer
    /// for positions.
    pub fn has_permission(&self, name: &str) -> bool {
        self.permissions.iter().any(|p| p.name == name)
    }
}

/// Everything needed to answer questions about one staff member, read at a
/// single point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaffSubject {
    pub staff: StaffRecord,
    pub base: Vec<Permission>,
    pub overrides: Vec<PermissionOverride>,
}

impl StaffSubject {
    pub fn effective_permissions(&self) -> EffectivePermissions {
        resolve(&self.base, &self.overrides)
    }

    /// Same answer as `effective_permissions().contains_name(name)` without
    /// building the set.
    pub fn has_permission(&self, name: &str) -> bool {
        let mut decided = None;
        for o in self.overrides.iter().filter(|o| o.permission.name == name) {
            // revocations win over grants for the same permission
            decided = Some(decided.unwrap_or(true) && o.granted);
        }
        decided.unwrap_or_else(|| self.base.iter().any(|p| p.name == name))
    }
}

/// Resolved permission set, deduplicated by `permission_id`.
///
/// Iterates in ascending `permission_id` order; callers that need another
/// order sort explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectivePermissions {
    by_id: BTreeMap<i64, Permission>,
}

impl EffectivePermissions {
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn contains_id(&self, permission_id: i64) -> bool {
        self.by_id.contains_key(&permission_id)
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.by_id.values().any(|p| p.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.by_id.values()
    }

    pub fn ids(&self) -> Vec<i64> {
        self.by_id.keys().copied().collect()
    }

    /// Permission names sorted alphabetically.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.by_id.values().map(|p| p.name.clone()).collect();
        names.sort();
        names
    }

    pub fn into_vec(self) -> Vec<Permission> {
        self.by_id.into_values().collect()
    }
}

impl FromIterator<Permission> for EffectivePermissions {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        Self {
            by_id: iter.into_iter().map(|p| (p.permission_id, p)).collect(),
        }
    }
}

/// Merge a base set with override rows.
///
/// Grants are applied before revocations, so the outcome does not depend on
/// the order of either input.
pub fn resolve(base: &[Permission], overrides: &[PermissionOverride]) -> EffectivePermissions {
    let mut by_id: BTreeMap<i64, Permission> = base
        .iter()
        .map(|p| (p.permission_id, p.clone()))
        .collect();

    for o in overrides.iter().filter(|o| o.granted) {
        by_id
            .entry(o.permission.permission_id)
            .or_insert_with(|| o.permission.clone());
    }

    for o in overrides.iter().filter(|o| !o.granted) {
        by_id.remove(&o.permission.permission_id);
    }

    EffectivePermissions { by_id }
}

/// Answers permission questions about staff and positions and records
/// grant/revoke overrides. Holds no state besides its store, so clones are
/// cheap and calls can run concurrently.
#[derive(Debug, Clone)]
pub struct PermissionResolver<S> {
    store: S,
}

impl<S: PermissionStore> PermissionResolver<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Snapshot of a staff member's position set and overrides.
    pub async fn subject(&self, staff_id: i64) -> AppResult<StaffSubject> {
        self.store.load_subject(staff_id).await
    }

    pub async fn effective_permissions(&self, staff_id: i64) -> AppResult<EffectivePermissions> {
        let subject = self.store.load_subject(staff_id).await?;
        Ok(subject.effective_permissions())
    }

    pub async fn has_permission(&self, staff_id: i64, permission_name: &str) -> AppResult<bool> {
        let subject = self.store.load_subject(staff_id).await?;
        Ok(subject.has_permission(permission_name))
    }

    pub async fn position_has_permission(
        &self,
        position_id: i64,
        permission_name: &str,
    ) -> AppResult<bool> {
        let position = self.store.load_position(position_id).await?;
        Ok(position.has_permission(permission_name))
    }

    /// Record an explicit grant. Re-granting overwrites the existing row.
    pub async fn grant(&self, staff_id: i64, permission_id: i64) -> AppResult<StaffPermission> {
        self.set_override(staff_id, permission_id, true).await
    }

    /// Record an explicit revocation. The row is kept with `granted = false`
    /// so it keeps suppressing a position grant.
    pub async fn revoke(&self, staff_id: i64, permission_id: i64) -> AppResult<StaffPermission> {
        self.set_override(staff_id, permission_id, false).await
    }

    async fn set_override(
        &self,
        staff_id: i64,
        permission_id: i64,
        granted: bool,
    ) -> AppResult<StaffPermission> {
        self.store.load_staff(staff_id).await?;
        let permission = self.store.load_permission(permission_id).await?;

        let row = self
            .store
            .upsert_override(staff_id, permission_id, granted)
            .await
            .map_err(|err| match err {
                AppError::NotFound(_) => AppError::not_found(format!(
                    "staff {staff_id} or permission {permission_id} not found"
                )),
                other => other,
            })?;

        tracing::info!(
            staff_id,
            permission_id,
            permission = %permission.name,
            granted,
            "staff permission override set"
        );

        Ok(row)
    }
}
