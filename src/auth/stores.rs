//! Startup wiring: open both stores from a [`StoreConfig`].

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::StoreConfig;
use crate::store::{MinKeyLength, SharedChecker};

use super::group::{GroupStore, MemberSet, MinNameLengths};
use super::hasher::Pbkdf2Hasher;
use super::principal::PrincipalStore;
use super::validate::validate;

/// The principal and group stores of one deployment.
#[derive(Debug)]
pub struct AuthStores {
    pub principals: PrincipalStore,
    pub groups: GroupStore,
}

impl AuthStores {
    /// Open (or start) both stores, then optionally cross-check them.
    ///
    /// Any failure here is meant to abort startup.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let user_gate: SharedChecker<String> =
            Arc::new(MinKeyLength::new("user name", config.min_user_name_len));
        let principals =
            PrincipalStore::open_with(&config.principal_file, user_gate, config.replay_policy)
                .with_context(|| {
                    format!(
                        "Failed to open principal store {}",
                        config.principal_file.display()
                    )
                })?
                .with_hasher(Arc::new(Pbkdf2Hasher::new(config.hash_iterations)))
                .with_min_password_len(config.min_password_len);

        let role_gate: SharedChecker<MemberSet> = Arc::new(MinNameLengths::new(
            config.min_role_name_len,
            config.min_user_name_len,
        ));
        let groups = GroupStore::open_with(&config.group_file, role_gate, config.replay_policy)
            .with_context(|| {
                format!(
                    "Failed to open group store {}",
                    config.group_file.display()
                )
            })?;

        if config.validate_on_open {
            validate(&principals, &groups).context("Store validation failed")?;
        }

        tracing::info!(
            users = principals.len(),
            roles = groups.len(),
            "Auth stores initialized"
        );
        Ok(Self { principals, groups })
    }

    /// Whether `user` holds `role`. Users without a principal record hold
    /// nothing, even if a role still lists them.
    pub fn authorized(&self, role: &str, user: &str) -> bool {
        self.principals.contains(user) && self.groups.authorized(role, user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::group::member_set;
    use crate::error::StoreError;
    use tempfile::TempDir;

    fn test_config(tmp: &TempDir) -> StoreConfig {
        StoreConfig {
            principal_file: tmp.path().join("users.tsv"),
            group_file: tmp.path().join("roles.tsv"),
            hash_iterations: 10,
            ..StoreConfig::default()
        }
    }

    #[test]
    fn fresh_directory_opens_empty() {
        let tmp = TempDir::new().unwrap();
        let stores = AuthStores::open(&test_config(&tmp)).unwrap();
        assert!(stores.principals.is_empty());
        assert!(stores.groups.is_empty());
    }

    #[test]
    fn config_gates_apply() {
        let tmp = TempDir::new().unwrap();
        let stores = AuthStores::open(&test_config(&tmp)).unwrap();

        assert!(stores.principals.insert_user("bob", "secret1").is_err());
        assert!(stores.principals.insert_user("robert", "abc").is_err());
        stores.principals.insert_user("robert", "secret1").unwrap();
        assert!(stores.principals.authenticate("robert", "secret1").unwrap());
    }

    #[test]
    fn config_gates_apply_to_roles() {
        let tmp = TempDir::new().unwrap();
        let stores = AuthStores::open(&test_config(&tmp)).unwrap();
        stores.principals.insert_user("robert", "secret1").unwrap();

        assert!(matches!(
            stores.groups.add_members("ops", ["robert"]),
            Err(StoreError::Constraint(_))
        ));
        assert!(matches!(
            stores.groups.add_members("admin", ["bob"]),
            Err(StoreError::Constraint(_))
        ));
        assert!(stores.groups.is_empty());

        stores.groups.add_members("admin", ["robert"]).unwrap();
        assert!(stores.authorized("admin", "robert"));
    }

    #[test]
    fn role_gate_screens_replayed_records() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(&tmp);
        std::fs::write(&config.group_file, "ops\trobert\n").unwrap();

        let err = AuthStores::open(&config).unwrap_err();
        assert!(format!("{err:#}").contains("role name must have min 4 chars"));
    }

    #[test]
    fn dangling_reference_aborts_open() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(&tmp);
        GroupStore::open(&config.group_file)
            .unwrap()
            .insert("admin", member_set(["dave"]))
            .unwrap();

        let err = AuthStores::open(&config).unwrap_err();
        assert!(format!("{err:#}").contains("role admin contains invalid user: dave"));

        let lenient = StoreConfig {
            validate_on_open: false,
            ..config
        };
        let stores = AuthStores::open(&lenient).unwrap();
        assert!(!stores.authorized("admin", "dave"));
    }
}
