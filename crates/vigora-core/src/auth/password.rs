//! PasswordHasher trait definition.
//!
//! Keeps the concrete KDF (Argon2id in vigora-infra) out of the core crate.

use vigora_types::error::AuthError;

/// Trait for password hashing and verification.
///
/// Implementations live in vigora-infra (e.g., `Argon2PasswordHasher`).
/// Hashing is CPU-bound, not async; callers run it before any await point.
pub trait PasswordHasher: Send + Sync {
    /// Hash a plaintext password into a self-describing PHC string.
    fn hash(&self, password: &str) -> Result<String, AuthError>;

    /// Verify a plaintext password against a stored hash.
    ///
    /// Returns `Ok(false)` on mismatch; `Err` only for malformed hashes.
    fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError>;
}
