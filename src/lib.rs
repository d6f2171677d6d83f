//! Flat-file principal and group stores.
//!
//! Two append-only, tab-separated logs back an in-memory view of who the users
//! are (name → password hash) and which roles they hold (role → members).
//!
//! ```no_run
//! use authlog::{AuthStores, StoreConfig};
//!
//! # fn main() -> anyhow::Result<()> {
//! let stores = AuthStores::open(&StoreConfig::default())?;
//! stores.principals.insert_user("carol", "s3cret")?;
//! stores.groups.add_members("admin", ["carol"])?;
//! assert!(stores.authorized("admin", "Carol"));
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod store;

pub use auth::{
    dangling_members, validate, AuthStores, GroupStore, MemberSet, PasswordHasher, Pbkdf2Hasher,
    PrincipalStore,
};
pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use store::{ConstraintChecker, MinKeyLength, RecordStore, ReplayPolicy};
