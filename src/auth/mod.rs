//! Users, roles and the checks that tie them together.
//!
//! Provides:
//! - A principal store mapping user names to password hashes
//! - A group store mapping role names to member sets
//! - PBKDF2-SHA256 password hashing behind a swappable trait
//! - A cross-store validator for dangling role members
//!
//! ## Design Decisions
//! - Both stores are [`RecordStore`](crate::store::RecordStore) instances with
//!   their own lock and log; there is no cross-store transaction.
//! - Stored password hashes carry their scheme and iteration count, so raising
//!   the cost does not invalidate existing users.
//! - Validation is a one-shot pass at startup or on demand, not an invariant
//!   enforced on every write.

pub mod group;
pub mod hasher;
pub mod principal;
pub mod stores;
pub mod validate;

pub use group::{member_set, GroupStore, MemberSet, MinNameLengths};
pub use hasher::{PasswordHasher, Pbkdf2Hasher};
pub use principal::PrincipalStore;
pub use stores::AuthStores;
pub use validate::{dangling_members, validate};
