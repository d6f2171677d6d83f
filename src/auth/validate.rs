//! Cross-store integrity check: every role member must be a known user.
//!
//! Run at startup and on demand. The two stores are mutated independently, so
//! a passing check says nothing about later states.

use crate::error::{StoreError, StoreResult};

use super::group::GroupStore;
use super::principal::PrincipalStore;

/// Fail on the first member (roles and members in sorted order) that has no
/// principal record.
pub fn validate(principals: &PrincipalStore, groups: &GroupStore) -> StoreResult<()> {
    for (role, members) in groups.list_roles_and_members() {
        if let Some(user) = members.into_iter().find(|m| !principals.contains(m)) {
            tracing::warn!(role = %role, user = %user, "Role references unknown user");
            return Err(StoreError::DanglingMember { role, user });
        }
    }
    Ok(())
}

/// Every `(role, user)` pair whose user has no principal record.
pub fn dangling_members(principals: &PrincipalStore, groups: &GroupStore) -> Vec<(String, String)> {
    groups
        .list_roles_and_members()
        .into_iter()
        .flat_map(|(role, members)| {
            members
                .into_iter()
                .filter(|m| !principals.contains(m))
                .map(move |user| (role.clone(), user))
        })
        .collect()
}
