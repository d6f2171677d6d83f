//! Error types shared by every store in the crate.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by the record stores and the cross-store validator.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Rejected by the built-in check or the installed constraint gate.
    /// The map and the log are untouched.
    #[error("constraints failed: {0}")]
    Constraint(String),

    /// `insert` on a key that is already present.
    #[error("{kind} already exists: {key}")]
    DuplicateKey {
        /// Record kind ("user", "role", ...).
        kind: &'static str,
        /// Normalized key.
        key: String,
    },

    /// The key (or a role member) is not present.
    #[error("no such {kind}: {key}")]
    NotFound {
        /// Record kind ("user", "role", "member", ...).
        kind: &'static str,
        /// Normalized key.
        key: String,
    },

    /// Replay hit a line that cannot be applied to the map rebuilt so far.
    #[error("corrupt log {}:{line}: {reason}", path.display())]
    CorruptLog {
        /// Log file being replayed.
        path: PathBuf,
        /// 1-based line number.
        line: usize,
        /// What was wrong with the line.
        reason: String,
    },

    /// The log file could not be opened, read or written.
    #[error("failed to access '{}': {source}", path.display())]
    Io {
        /// File involved in the failed operation.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Mutation attempted on a store replayed from a compressed log.
    #[error("store backed by '{}' is read-only", .0.display())]
    ReadOnly(PathBuf),

    /// `save_file` on a store that has no backing file.
    #[error("file name not set")]
    NoBackingFile,

    /// A role references a user that the principal store does not know.
    #[error("role {role} contains invalid user: {user}")]
    DanglingMember {
        /// Offending role.
        role: String,
        /// Missing user.
        user: String,
    },

    /// The password hashing capability failed.
    #[error("password hash error: {0}")]
    Hash(String),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the caller can recover locally (bad input, missing or
    /// duplicate key) as opposed to a storage fault.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Constraint(_)
                | Self::DuplicateKey { .. }
                | Self::NotFound { .. }
                | Self::DanglingMember { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_key() {
        let err = StoreError::NotFound {
            kind: "user",
            key: "ghost".into(),
        };
        assert_eq!(err.to_string(), "no such user: ghost");

        let err = StoreError::DanglingMember {
            role: "admin".into(),
            user: "dave".into(),
        };
        assert_eq!(err.to_string(), "role admin contains invalid user: dave");
    }

    #[test]
    fn storage_faults_are_not_recoverable() {
        let io = StoreError::io("users.tsv", std::io::Error::other("disk full"));
        assert!(!io.is_recoverable());
        assert!(io.to_string().contains("users.tsv"));
        assert!(StoreError::Constraint("empty user".into()).is_recoverable());
    }
}
