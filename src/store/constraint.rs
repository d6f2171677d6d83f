//! Pluggable constraint gate.
//!
//! Every insert and update (live or replayed) passes two checks: the built-in
//! structural check on keys and values, then the store's [`ConstraintChecker`].
//! The owning application swaps the checker to enforce its own policy
//! (minimum lengths, e-mail shaped user names, reserved role names, ...).

use std::sync::Arc;

/// Validates a record before it is accepted by a store.
///
/// Returns `Err(reason)` to reject; the reason ends up in
/// [`StoreError::Constraint`](crate::StoreError::Constraint).
pub trait ConstraintChecker<V: ?Sized>: Send + Sync {
    fn check(&self, key: &str, value: &V) -> Result<(), String>;
}

impl<V: ?Sized, F> ConstraintChecker<V> for F
where
    F: Fn(&str, &V) -> Result<(), String> + Send + Sync,
{
    fn check(&self, key: &str, value: &V) -> Result<(), String> {
        self(key, value)
    }
}

/// Default gate: accepts every record that passed the built-in check.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl<V: ?Sized> ConstraintChecker<V> for AllowAll {
    fn check(&self, _key: &str, _value: &V) -> Result<(), String> {
        Ok(())
    }
}

/// Rejects keys shorter than `min_len` characters.
#[derive(Debug, Clone)]
pub struct MinKeyLength {
    kind: &'static str,
    min_len: usize,
}

impl MinKeyLength {
    pub fn new(kind: &'static str, min_len: usize) -> Self {
        Self { kind, min_len }
    }
}

impl<V: ?Sized> ConstraintChecker<V> for MinKeyLength {
    fn check(&self, key: &str, _value: &V) -> Result<(), String> {
        if key.chars().count() < self.min_len {
            return Err(format!(
                "{} must have min {} chars",
                self.kind, self.min_len
            ));
        }
        Ok(())
    }
}

/// Shared handle to a type-erased gate.
pub type SharedChecker<V> = Arc<dyn ConstraintChecker<V>>;

pub(crate) fn allow_all<V: ?Sized + 'static>() -> SharedChecker<V> {
    Arc::new(AllowAll)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_are_checkers() {
        let gate = |key: &str, _value: &String| {
            if key.contains('@') {
                Ok(())
            } else {
                Err("user name must be an email address".to_string())
            }
        };
        assert!(gate.check("leif", &"h".to_string()).is_err());
        assert!(gate.check("nizze@somewhere.else", &"h".to_string()).is_ok());
    }

    #[test]
    fn min_key_length_counts_chars() {
        let gate = MinKeyLength::new("user name", 4);
        let value = String::from("h");
        assert_eq!(
            ConstraintChecker::<String>::check(&gate, "bob", &value),
            Err("user name must have min 4 chars".to_string())
        );
        assert!(ConstraintChecker::<String>::check(&gate, "robert", &value).is_ok());
        assert!(ConstraintChecker::<String>::check(&gate, "åsa1", &value).is_ok());
    }

    #[test]
    fn allow_all_accepts_anything() {
        let gate: SharedChecker<str> = allow_all();
        assert!(gate.check("", "").is_ok());
    }
}
