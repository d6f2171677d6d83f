//! Key normalization and the built-in field check.

/// Separates fields within one log line.
pub const FIELD_SEPARATOR: char = '\t';

/// Separates items within a list-valued field (role members).
pub const ITEM_SEPARATOR: char = ' ';

/// Marker that starts a comment line.
pub const COMMENT_PREFIX: char = '#';

/// Normalize a key: surrounding whitespace trimmed, lowercased.
pub fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase()
}

/// Built-in check every key (and every role member) must pass before it may
/// reach the map or the log. `kind` names the field in the rejection reason.
pub fn check_field(kind: &str, value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Err(format!("empty {kind}"));
    }
    if value.contains(FIELD_SEPARATOR) {
        return Err(format!("{kind} cannot contain a tab"));
    }
    if value.contains(ITEM_SEPARATOR) {
        return Err(format!("{kind} cannot contain a space"));
    }
    if value.contains(['\n', '\r']) {
        return Err(format!("{kind} cannot contain a line break"));
    }
    if value.starts_with(COMMENT_PREFIX) {
        return Err(format!("{kind} cannot start with {COMMENT_PREFIX}"));
    }
    if normalize_key(value) != value {
        return Err(format!("{kind} is not normalised"));
    }
    Ok(())
}
