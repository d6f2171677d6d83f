//! Store configuration, loadable from TOML.
//!
//! ```toml
//! principal_file = "/var/lib/authlog/users.tsv"
//! group_file = "/var/lib/authlog/roles.tsv"
//! min_user_name_len = 4
//! min_role_name_len = 4
//! min_password_len = 4
//! hash_iterations = 100000
//! replay_policy = "strict"
//! validate_on_open = true
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::auth::hasher::DEFAULT_HASH_ITERATIONS;
use crate::auth::principal::DEFAULT_MIN_PASSWORD_LEN;
use crate::store::ReplayPolicy;

/// Where the two stores live and which policies guard them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Principal store log (user → password hash).
    pub principal_file: PathBuf,
    /// Group store log (role → members).
    pub group_file: PathBuf,
    /// Shortest accepted user name (and role member), in characters.
    /// 0 disables the check.
    pub min_user_name_len: usize,
    /// Shortest accepted role name, in characters. 0 disables the check.
    pub min_role_name_len: usize,
    /// Shortest accepted plaintext password, in characters.
    pub min_password_len: usize,
    /// PBKDF2 iterations for newly hashed passwords.
    pub hash_iterations: u32,
    /// How replay treats a repeated insert line.
    pub replay_policy: ReplayPolicy,
    /// Run the cross-store validator after both stores are open.
    pub validate_on_open: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            principal_file: PathBuf::from("users.tsv"),
            group_file: PathBuf::from("roles.tsv"),
            min_user_name_len: 4,
            min_role_name_len: 4,
            min_password_len: DEFAULT_MIN_PASSWORD_LEN,
            hash_iterations: DEFAULT_HASH_ITERATIONS,
            replay_policy: ReplayPolicy::Strict,
            validate_on_open: true,
        }
    }
}

impl StoreConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Failed to parse store config")
    }

    /// Read and parse a TOML config file. Relative store paths are resolved
    /// against the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let mut config = Self::from_toml_str(&contents)
            .with_context(|| format!("Invalid config {}", path.display()))?;

        if let Some(base) = path.parent() {
            config.principal_file = resolve(base, &config.principal_file);
            config.group_file = resolve(base, &config.group_file);
        }
        Ok(config)
    }
}

fn resolve(base: &Path, file: &Path) -> PathBuf {
    if file.is_absolute() {
        file.to_path_buf()
    } else {
        base.join(file)
    }
}
