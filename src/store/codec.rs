//! Text encoding of log lines and record values.
//!
//! ```text
//! <key>\t<value>               insert
//! UPDATE\t<key>\t<value>       overwrite an existing key
//! DELETE\t<key>                delete
//! # ...                        comment
//! ```

use std::collections::BTreeSet;

use super::key::{check_field, COMMENT_PREFIX, FIELD_SEPARATOR, ITEM_SEPARATOR};

/// Opcode marking a deletion entry.
pub const DELETE_OP: &str = "DELETE";

/// Opcode marking an overwrite of an existing key.
pub const UPDATE_OP: &str = "UPDATE";

/// A value that can be stored in a [`RecordStore`](super::RecordStore).
pub trait RecordValue: Clone + Send + Sync + 'static {
    /// Render the value as the last field of a log line.
    fn encode(&self) -> String;

    /// Parse the last field of a log line.
    fn decode(field: &str) -> Self;

    /// Built-in structural check, run before the pluggable gate.
    fn check(&self) -> Result<(), String>;
}

/// Scalar values (password hashes).
impl RecordValue for String {
    fn encode(&self) -> String {
        self.clone()
    }

    fn decode(field: &str) -> Self {
        field.to_string()
    }

    fn check(&self) -> Result<(), String> {
        if self.is_empty() {
            return Err("empty value".to_string());
        }
        if self.contains(FIELD_SEPARATOR) || self.contains(['\n', '\r']) {
            return Err("value cannot contain a tab or a line break".to_string());
        }
        Ok(())
    }
}

/// Member sets: written sorted and space-joined, read back into a set.
impl RecordValue for BTreeSet<String> {
    fn encode(&self) -> String {
        let mut out = String::new();
        for (i, member) in self.iter().enumerate() {
            if i > 0 {
                out.push(ITEM_SEPARATOR);
            }
            out.push_str(member);
        }
        out
    }

    fn decode(field: &str) -> Self {
        field.split(ITEM_SEPARATOR).map(str::to_string).collect()
    }

    fn check(&self) -> Result<(), String> {
        if self.is_empty() {
            return Err("empty member list".to_string());
        }
        self.iter().try_for_each(|member| check_field("user", member))
    }
}

/// One parsed log line, borrowing from the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogEntry<'a> {
    Put { key: &'a str, value: &'a str },
    Update { key: &'a str, value: &'a str },
    Delete { key: &'a str },
}

impl<'a> LogEntry<'a> {
    /// Parse one line. `Ok(None)` for comments and blank lines.
    pub fn parse(line: &'a str) -> Result<Option<Self>, String> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with(COMMENT_PREFIX) {
            return Ok(None);
        }

        let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
        match fields[..] {
            [op, key] if op == DELETE_OP => Ok(Some(Self::Delete { key })),
            [op, key, value] if op == UPDATE_OP => Ok(Some(Self::Update { key, value })),
            [op, ..] if op == DELETE_OP || op == UPDATE_OP => {
                Err(format!("malformed {op} entry: {} fields", fields.len()))
            }
            [key, value] => Ok(Some(Self::Put { key, value })),
            _ => Err(format!(
                "expected 2 tab-separated fields, found {}",
                fields.len()
            )),
        }
    }

    /// Render as a line, without the trailing newline.
    pub fn to_line(&self) -> String {
        let sep = FIELD_SEPARATOR;
        match self {
            Self::Put { key, value } => format!("{key}{sep}{value}"),
            Self::Update { key, value } => format!("{UPDATE_OP}{sep}{key}{sep}{value}"),
            Self::Delete { key } => format!("{DELETE_OP}{sep}{key}"),
        }
    }

    pub fn key(&self) -> &'a str {
        match *self {
            Self::Put { key, .. } | Self::Update { key, .. } | Self::Delete { key } => key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_entry_kind() {
        assert_eq!(
            LogEntry::parse("carol\thash1").unwrap(),
            Some(LogEntry::Put {
                key: "carol",
                value: "hash1"
            })
        );
        assert_eq!(
            LogEntry::parse("UPDATE\tcarol\thash2").unwrap(),
            Some(LogEntry::Update {
                key: "carol",
                value: "hash2"
            })
        );
        assert_eq!(
            LogEntry::parse("DELETE\tcarol").unwrap(),
            Some(LogEntry::Delete { key: "carol" })
        );
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        assert_eq!(LogEntry::parse("# users").unwrap(), None);
        assert_eq!(LogEntry::parse("   # indented").unwrap(), None);
        assert_eq!(LogEntry::parse("").unwrap(), None);
    }

    #[test]
    fn rejects_truncated_and_malformed_lines() {
        assert!(LogEntry::parse("caro").is_err());
        assert!(LogEntry::parse("DELETE").is_err());
        assert!(LogEntry::parse("DELETE\ta\tb").is_err());
        assert!(LogEntry::parse("UPDATE\tcarol").is_err());
        assert!(LogEntry::parse("a\tb\tc").is_err());
    }

    #[test]
    fn lines_render_back_to_the_same_entry() {
        for line in ["carol\thash1", "UPDATE\tcarol\th2", "DELETE\tcarol"] {
            let entry = LogEntry::parse(line).unwrap().unwrap();
            assert_eq!(entry.to_line(), line);
            assert_eq!(entry.key(), "carol");
        }
    }

    #[test]
    fn member_sets_encode_sorted_and_deduplicate() {
        let members = BTreeSet::<String>::decode("james angela james");
        assert_eq!(members.len(), 2);
        assert_eq!(members.encode(), "angela james");
    }

    #[test]
    fn member_set_check_flags_empty_items() {
        assert!(BTreeSet::<String>::decode("a  b").check().is_err());
        assert!(BTreeSet::<String>::new().check().is_err());
        assert!(BTreeSet::<String>::decode("#a b").check().is_err());
        assert!(BTreeSet::<String>::decode("a b").check().is_ok());
    }

    #[test]
    fn scalar_check_rejects_empty_hash() {
        assert!(String::new().check().is_err());
        assert!("pbkdf2-sha256$1$00$00".to_string().check().is_ok());
    }
}
