use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{self, SaltString},
};
use rand_core::OsRng;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PasswordError {
    /// Wrong password. An expected outcome, not a fault.
    #[error("password does not match")]
    Mismatch,

    #[error("password hashing failed: {0}")]
    Hash(String),
}

/// Hash a password with Argon2id and a fresh random salt. Returns the PHC string.
pub fn hash_password(plaintext: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::Hash(e.to_string()))
}

pub fn verify_password(hash: &str, plaintext: &str) -> Result<(), PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(|e| PasswordError::Hash(e.to_string()))?;

    Argon2::default()
        .verify_password(plaintext.as_bytes(), &parsed)
        .map_err(|e| match e {
            password_hash::Error::Password => PasswordError::Mismatch,
            other => PasswordError::Hash(other.to_string()),
        })
}
