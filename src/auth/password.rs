//! Password hashing

use crate::error::{Error, Result};

/// Hash a plaintext password with bcrypt at the given cost
pub fn hash(plaintext: &str, cost: u32) -> Result<String> {
    Ok(bcrypt::hash(plaintext, cost)?)
}

/// Check a plaintext password against a stored digest.
///
/// A digest that cannot be parsed never matches.
pub fn check(plaintext: &str, digest: &str) -> bool {
    bcrypt::verify(plaintext, digest).unwrap_or(false)
}

/// Initial password for a freshly created account: prefix followed by the matricula
pub fn default_password(prefix: &str, matricula: i64) -> String {
    format!("{}{}", prefix, matricula)
}

/// `hash` on the blocking pool; bcrypt is deliberately slow
pub async fn hash_blocking(plaintext: String, cost: u32) -> Result<String> {
    tokio::task::spawn_blocking(move || hash(&plaintext, cost))
        .await
        .map_err(|e| Error::Other(format!("Password hashing task failed: {}", e)))?
}

/// `check` on the blocking pool
pub async fn check_blocking(plaintext: String, digest: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || check(&plaintext, &digest))
        .await
        .map_err(|e| Error::Other(format!("Password check task failed: {}", e)))
}
