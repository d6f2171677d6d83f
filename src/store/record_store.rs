//! Generic record store: an in-memory map rebuilt from, and persisted to, an
//! append log.
//!
//! Writes follow append-then-commit: under the write lock a mutation is
//! validated, its log line is written, and only then is the map changed. A
//! failed append therefore leaves the map exactly as it was.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::codec::{LogEntry, RecordValue};
use super::constraint::{allow_all, ConstraintChecker, SharedChecker};
use super::key::{check_field, normalize_key};
use super::log::AppendLog;
use crate::error::{StoreError, StoreResult};

/// How replay treats a second insert line for a key that is already live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayPolicy {
    /// Reject it as a corrupt log, matching live `insert`. Overwrites must
    /// use the `UPDATE` opcode.
    #[default]
    Strict,
    /// Let the later line win. For logs from tools that wrote overwrites as
    /// plain insert lines.
    LastWriteWins,
}

/// What a mutation does to a single key, decided while the write lock is held.
#[derive(Debug, Clone)]
pub(crate) enum Mutation<V> {
    Insert(V),
    Update(V),
    Delete,
    Unchanged,
}

struct Inner<V: RecordValue> {
    records: BTreeMap<String, V>,
    gate: SharedChecker<V>,
}

/// A lock-guarded map of normalized keys to values, optionally backed by an
/// append log.
pub struct RecordStore<V: RecordValue> {
    kind: &'static str,
    log: Option<AppendLog>,
    inner: RwLock<Inner<V>>,
}

impl<V: RecordValue> RecordStore<V> {
    /// A store with no backing file. `kind` names records in errors.
    pub fn in_memory(kind: &'static str) -> Self {
        Self::with_parts(kind, None, BTreeMap::new(), allow_all())
    }

    /// Open the store at `path`, replaying the log if the file exists.
    pub fn open(kind: &'static str, path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::open_with(kind, path, allow_all(), ReplayPolicy::default())
    }

    /// Open with a gate that also applies to replayed records.
    pub fn open_with(
        kind: &'static str,
        path: impl AsRef<Path>,
        gate: SharedChecker<V>,
        policy: ReplayPolicy,
    ) -> StoreResult<Self> {
        let log = AppendLog::new(path.as_ref());
        let records = if log.exists() {
            replay(kind, &log, gate.as_ref(), policy)?
        } else {
            tracing::debug!(path = %log.path().display(), kind, "No log yet, starting empty");
            BTreeMap::new()
        };
        Ok(Self::with_parts(kind, Some(log), records, gate))
    }

    /// Bind to `path`, discarding any existing file.
    pub fn create_empty(kind: &'static str, path: impl AsRef<Path>) -> StoreResult<Self> {
        let log = AppendLog::new(path.as_ref());
        log.remove()?;
        Ok(Self::with_parts(kind, Some(log), BTreeMap::new(), allow_all()))
    }

    fn with_parts(
        kind: &'static str,
        log: Option<AppendLog>,
        records: BTreeMap<String, V>,
        gate: SharedChecker<V>,
    ) -> Self {
        Self {
            kind,
            log,
            inner: RwLock::new(Inner { records, gate }),
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.log.as_ref().map(AppendLog::path)
    }

    /// Replace the pluggable gate.
    pub fn set_constraint_gate(&self, gate: impl ConstraintChecker<V> + 'static) {
        self.set_shared_gate(Arc::new(gate));
    }

    pub(crate) fn set_shared_gate(&self, gate: SharedChecker<V>) {
        self.inner.write().gate = gate;
    }

    /// Add a new record. Fails with `DuplicateKey` if the key exists.
    pub fn insert(&self, key: &str, value: V) -> StoreResult<()> {
        let kind = self.kind;
        self.modify(key, |key, current| match current {
            Some(_) => Err(StoreError::DuplicateKey {
                kind,
                key: key.to_string(),
            }),
            None => Ok(Mutation::Insert(value)),
        })
    }

    /// Overwrite an existing record. Fails with `NotFound` if it is missing.
    pub fn update(&self, key: &str, value: V) -> StoreResult<()> {
        let kind = self.kind;
        self.modify(key, |key, current| match current {
            Some(_) => Ok(Mutation::Update(value)),
            None => Err(StoreError::NotFound {
                kind,
                key: key.to_string(),
            }),
        })
    }

    /// Remove an existing record. Fails with `NotFound` if it is missing.
    pub fn delete(&self, key: &str) -> StoreResult<()> {
        let kind = self.kind;
        self.modify(key, |key, current| match current {
            Some(_) => Ok(Mutation::Delete),
            None => Err(StoreError::NotFound {
                kind,
                key: key.to_string(),
            }),
        })
    }

    /// Read-modify-write of one key inside a single write-lock critical
    /// section. `decide` sees the normalized key and the current value.
    pub(crate) fn modify<F>(&self, key: &str, decide: F) -> StoreResult<()>
    where
        F: FnOnce(&str, Option<&V>) -> StoreResult<Mutation<V>>,
    {
        let key = normalize_key(key);
        let mut inner = self.inner.write();

        let mutation = decide(&key, inner.records.get(&key))?;
        let line = match &mutation {
            Mutation::Unchanged => return Ok(()),
            Mutation::Insert(value) | Mutation::Update(value) => {
                validate(self.kind, &key, value, inner.gate.as_ref())
                    .map_err(StoreError::Constraint)?;
                let encoded = value.encode();
                if matches!(mutation, Mutation::Insert(_)) {
                    LogEntry::Put {
                        key: &key,
                        value: &encoded,
                    }
                    .to_line()
                } else {
                    LogEntry::Update {
                        key: &key,
                        value: &encoded,
                    }
                    .to_line()
                }
            }
            Mutation::Delete => LogEntry::Delete { key: &key }.to_line(),
        };

        if let Some(log) = &self.log {
            if log.is_compressed() {
                return Err(StoreError::ReadOnly(log.path().to_path_buf()));
            }
            if let Err(e) = log.append(&line) {
                tracing::warn!(kind = self.kind, key = %key, "Failed to append to log: {e}");
                return Err(e);
            }
            tracing::debug!(kind = self.kind, key = %key, "Appended log entry");
        }

        match mutation {
            Mutation::Insert(value) | Mutation::Update(value) => {
                inner.records.insert(key, value);
            }
            Mutation::Delete => {
                inner.records.remove(&key);
            }
            Mutation::Unchanged => {}
        }
        Ok(())
    }

    /// Value for `key`, if present.
    pub fn lookup(&self, key: &str) -> Option<V> {
        self.inner.read().records.get(&normalize_key(key)).cloned()
    }

    /// Run `f` against the value for `key` without cloning it.
    pub fn with_value<R>(&self, key: &str, f: impl FnOnce(Option<&V>) -> R) -> R {
        let inner = self.inner.read();
        f(inner.records.get(&normalize_key(key)))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.read().records.contains_key(&normalize_key(key))
    }

    /// All keys, sorted.
    pub fn list_keys(&self) -> Vec<String> {
        self.inner.read().records.keys().cloned().collect()
    }

    /// Sorted copy of every record.
    pub fn snapshot(&self) -> BTreeMap<String, V> {
        self.inner.read().records.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().records.is_empty()
    }

    /// Compact the log: replace the file with one insert line per live
    /// record, sorted by key. The map is never touched.
    pub fn save_file(&self) -> StoreResult<()> {
        let log = self.log.as_ref().ok_or(StoreError::NoBackingFile)?;
        if log.is_compressed() {
            return Err(StoreError::ReadOnly(log.path().to_path_buf()));
        }

        // Write side held so no append can interleave with the rewrite.
        let inner = self.inner.write();
        log.rewrite(inner.records.iter().map(|(key, value)| {
            let encoded = value.encode();
            LogEntry::Put {
                key,
                value: &encoded,
            }
            .to_line()
        }))?;

        tracing::info!(
            path = %log.path().display(),
            kind = self.kind,
            records = inner.records.len(),
            "Compacted log"
        );
        Ok(())
    }
}

impl<V: RecordValue + std::fmt::Debug> std::fmt::Debug for RecordStore<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("kind", &self.kind)
            .field("path", &self.path())
            .field("records", &self.len())
            .finish()
    }
}

/// Built-in check on key and value, then the pluggable gate.
fn validate<V: RecordValue>(
    kind: &str,
    key: &str,
    value: &V,
    gate: &dyn ConstraintChecker<V>,
) -> Result<(), String> {
    check_field(kind, key)?;
    value.check()?;
    gate.check(key, value)
}

/// Rebuild the map by applying every log line in file order.
fn replay<V: RecordValue>(
    kind: &'static str,
    log: &AppendLog,
    gate: &dyn ConstraintChecker<V>,
    policy: ReplayPolicy,
) -> StoreResult<BTreeMap<String, V>> {
    let lines = log.read_lines()?;
    let mut records = BTreeMap::new();

    let corrupt = |line: usize, reason: String| StoreError::CorruptLog {
        path: log.path().to_path_buf(),
        line,
        reason,
    };

    for (idx, line) in lines.iter().enumerate() {
        let lineno = idx + 1;
        let Some(entry) = LogEntry::parse(line).map_err(|reason| corrupt(lineno, reason))? else {
            continue;
        };

        match entry {
            LogEntry::Delete { key } => {
                if records.remove(key).is_none() {
                    return Err(corrupt(lineno, format!("no such {kind}: {key}")));
                }
            }
            LogEntry::Put { key, value } | LogEntry::Update { key, value } => {
                let is_update = matches!(entry, LogEntry::Update { .. });
                let exists = records.contains_key(key);
                if is_update && !exists {
                    return Err(corrupt(lineno, format!("no such {kind}: {key}")));
                }
                if !is_update && exists && policy == ReplayPolicy::Strict {
                    return Err(corrupt(lineno, format!("{kind} already exists: {key}")));
                }

                let value = V::decode(value);
                validate(kind, key, &value, gate).map_err(|reason| {
                    StoreError::Constraint(format!(
                        "{}:{lineno}: {reason}",
                        log.path().display()
                    ))
                })?;
                records.insert(key.to_string(), value);
            }
        }
    }

    tracing::info!(
        path = %log.path().display(),
        kind,
        lines = lines.len(),
        records = records.len(),
        "Replayed log"
    );
    Ok(records)
}
