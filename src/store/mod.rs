//! Append-only, tab-separated record store.
//!
//! Each store is an in-memory `BTreeMap` rebuilt at open time by replaying a
//! flat text log, one mutation per line. Mutations are appended as they happen;
//! [`RecordStore::save_file`] compacts the log down to one line per live key.
//!
//! ## Design
//! - Keys are normalized (trimmed, lowercased) on every entry point.
//! - Readers share a `parking_lot::RwLock`; a writer holds it across the
//!   append so the map never runs ahead of the file.
//! - Logs ending in `.gz` are replayed through `flate2` and are read-only.
//! - Replay applies the same built-in check and constraint gate as live writes.

pub mod codec;
pub mod constraint;
pub mod key;
pub mod log;
pub mod record_store;

pub use codec::{LogEntry, RecordValue};
pub use constraint::{AllowAll, ConstraintChecker, MinKeyLength, SharedChecker};
pub use key::normalize_key;
pub use log::AppendLog;
pub use record_store::{RecordStore, ReplayPolicy};
