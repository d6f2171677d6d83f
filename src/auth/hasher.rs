//! Password hashing.
//!
//! Stored hashes are self-describing so the iteration count can be raised
//! without invalidating existing records:
//!
//! ```text
//! pbkdf2-sha256$<iterations>$<salt hex>$<hash hex>
//! ```

use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::{StoreError, StoreResult};

/// Scheme tag at the start of every stored hash.
const SCHEME: &str = "pbkdf2-sha256";

/// Salt byte length.
const SALT_BYTES: usize = 16;

/// Derived key length.
const KEY_BYTES: usize = 32;

/// Default PBKDF2 iteration count.
pub const DEFAULT_HASH_ITERATIONS: u32 = 100_000;

/// Turns plaintext passwords into opaque stored hashes and checks them.
pub trait PasswordHasher: Send + Sync {
    /// Hash `password` with a fresh salt.
    fn hash(&self, password: &str) -> StoreResult<String>;

    /// Check `password` against a hash produced by [`hash`](Self::hash).
    fn verify(&self, password: &str, stored: &str) -> StoreResult<bool>;
}

/// PBKDF2-HMAC-SHA256 with a random per-user salt.
#[derive(Debug, Clone)]
pub struct Pbkdf2Hasher {
    iterations: u32,
}

impl Pbkdf2Hasher {
    pub fn new(iterations: u32) -> Self {
        Self {
            iterations: iterations.max(1),
        }
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    fn derive(password: &str, salt: &[u8], iterations: u32) -> [u8; KEY_BYTES] {
        let mut key = [0u8; KEY_BYTES];
        pbkdf2::pbkdf2_hmac::<sha2::Sha256>(password.as_bytes(), salt, iterations, &mut key);
        key
    }
}

impl Default for Pbkdf2Hasher {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_ITERATIONS)
    }
}

impl PasswordHasher for Pbkdf2Hasher {
    fn hash(&self, password: &str) -> StoreResult<String> {
        let mut salt = [0u8; SALT_BYTES];
        OsRng
            .try_fill_bytes(&mut salt)
            .map_err(|e| StoreError::Hash(format!("salt generation failed: {e}")))?;
        let key = Self::derive(password, &salt, self.iterations);
        Ok(format!(
            "{SCHEME}${}${}${}",
            self.iterations,
            hex::encode(salt),
            hex::encode(key)
        ))
    }

    fn verify(&self, password: &str, stored: &str) -> StoreResult<bool> {
        let parts: Vec<&str> = stored.split('$').collect();
        let [scheme, iterations, salt, expected] = parts[..] else {
            return Err(StoreError::Hash("malformed password hash".into()));
        };
        if scheme != SCHEME {
            return Err(StoreError::Hash(format!("unsupported hash scheme: {scheme}")));
        }
        let iterations: u32 = iterations
            .parse()
            .map_err(|_| StoreError::Hash(format!("bad iteration count: {iterations}")))?;
        let salt = hex::decode(salt).map_err(|e| StoreError::Hash(format!("bad salt: {e}")))?;
        let expected =
            hex::decode(expected).map_err(|e| StoreError::Hash(format!("bad digest: {e}")))?;

        let key = Self::derive(password, &salt, iterations);
        Ok(constant_time_eq(&key, &expected))
    }
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
