//! Principal store: user name → password hash.

use std::path::Path;
use std::sync::Arc;

use crate::error::{StoreError, StoreResult};
use crate::store::{ConstraintChecker, RecordStore, ReplayPolicy, SharedChecker};

use super::hasher::{PasswordHasher, Pbkdf2Hasher};

/// Record kind used in error messages and logs.
pub const PRINCIPAL_KIND: &str = "user";

/// Minimum plaintext password length enforced by [`PrincipalStore::insert_user`].
pub const DEFAULT_MIN_PASSWORD_LEN: usize = 4;

/// Users and their password hashes, backed by an append log.
pub struct PrincipalStore {
    records: RecordStore<String>,
    hasher: Arc<dyn PasswordHasher>,
    min_password_len: usize,
}

impl PrincipalStore {
    pub fn in_memory() -> Self {
        Self::from_records(RecordStore::in_memory(PRINCIPAL_KIND))
    }

    /// Open the store at `path`, replaying it if present.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        RecordStore::open(PRINCIPAL_KIND, path).map(Self::from_records)
    }

    /// Open with a gate that also screens replayed records.
    pub fn open_with(
        path: impl AsRef<Path>,
        gate: SharedChecker<String>,
        policy: ReplayPolicy,
    ) -> StoreResult<Self> {
        RecordStore::open_with(PRINCIPAL_KIND, path, gate, policy).map(Self::from_records)
    }

    /// Bind to `path`, discarding any existing file.
    pub fn create_empty(path: impl AsRef<Path>) -> StoreResult<Self> {
        RecordStore::create_empty(PRINCIPAL_KIND, path).map(Self::from_records)
    }

    fn from_records(records: RecordStore<String>) -> Self {
        Self {
            records,
            hasher: Arc::new(Pbkdf2Hasher::default()),
            min_password_len: DEFAULT_MIN_PASSWORD_LEN,
        }
    }

    /// Replace the password hasher.
    #[must_use]
    pub fn with_hasher(mut self, hasher: Arc<dyn PasswordHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    #[must_use]
    pub fn with_min_password_len(mut self, min_len: usize) -> Self {
        self.min_password_len = min_len;
        self
    }

    pub fn set_constraint_gate(&self, gate: impl ConstraintChecker<String> + 'static) {
        self.records.set_constraint_gate(gate);
    }

    pub fn path(&self) -> Option<&Path> {
        self.records.path()
    }

    // ── Record API ──────────────────────────────────────────────────

    /// Add a user with an already-computed hash.
    pub fn insert(&self, user: &str, hash: impl Into<String>) -> StoreResult<()> {
        self.records.insert(user, hash.into())
    }

    /// Replace an existing user's hash.
    pub fn update(&self, user: &str, hash: impl Into<String>) -> StoreResult<()> {
        self.records.update(user, hash.into())
    }

    pub fn delete(&self, user: &str) -> StoreResult<()> {
        self.records.delete(user)
    }

    /// Stored hash for `user`.
    pub fn lookup(&self, user: &str) -> Option<String> {
        self.records.lookup(user)
    }

    pub fn contains(&self, user: &str) -> bool {
        self.records.contains(user)
    }

    /// All user names, sorted.
    pub fn list_keys(&self) -> Vec<String> {
        self.records.list_keys()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Compact the backing log.
    pub fn save_file(&self) -> StoreResult<()> {
        self.records.save_file()
    }

    // ── Passwords ───────────────────────────────────────────────────

    /// Hash `password` and add `user`.
    pub fn insert_user(&self, user: &str, password: &str) -> StoreResult<()> {
        let hash = self.hash_password(password)?;
        self.records.insert(user, hash)?;
        tracing::info!(user = %user.trim(), "User added");
        Ok(())
    }

    /// Hash `password` and replace the hash of an existing user.
    pub fn update_password(&self, user: &str, password: &str) -> StoreResult<()> {
        if !self.records.contains(user) {
            return Err(StoreError::NotFound {
                kind: PRINCIPAL_KIND,
                key: crate::store::normalize_key(user),
            });
        }
        let hash = self.hash_password(password)?;
        self.records.update(user, hash)?;
        tracing::info!(user = %user.trim(), "Password updated");
        Ok(())
    }

    /// Check `password` for `user`. `NotFound` when the user does not exist.
    pub fn authenticate(&self, user: &str, password: &str) -> StoreResult<bool> {
        let Some(stored) = self.records.lookup(user) else {
            return Err(StoreError::NotFound {
                kind: PRINCIPAL_KIND,
                key: crate::store::normalize_key(user),
            });
        };
        let ok = self.hasher.verify(password, &stored)?;
        if !ok {
            tracing::debug!(user = %user.trim(), "Password mismatch");
        }
        Ok(ok)
    }

    fn hash_password(&self, password: &str) -> StoreResult<String> {
        if password.chars().count() < self.min_password_len {
            return Err(StoreError::Constraint(format!(
                "password must have min {} chars",
                self.min_password_len
            )));
        }
        self.hasher.hash(password)
    }
}

impl std::fmt::Debug for PrincipalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrincipalStore")
            .field("records", &self.records)
            .field("min_password_len", &self.min_password_len)
            .finish_non_exhaustive()
    }
}
