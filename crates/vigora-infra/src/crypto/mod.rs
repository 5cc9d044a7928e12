//! Cryptographic operations: Argon2id password hashing.

pub mod password;

pub use password::Argon2PasswordHasher;
