//! Password hashing and verification using Argon2id

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use thiserror::Error;

/// Error types for password operations
#[derive(Error, Debug)]
pub enum PasswordError {
    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashingFailed(String),

    /// Failed to verify password
    #[error("Failed to verify password: {0}")]
    VerificationFailed(String),

    /// Invalid password hash format
    #[error("Invalid password hash format: {0}")]
    InvalidHashFormat(String),
}

/// Hash a password using Argon2id with a per-user random salt.
///
/// Produces a PHC-formatted string (`$argon2id$...`) that embeds the salt
/// and parameters, suitable for storing in the `users.password_hash` column.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let argon2 = Argon2::default();

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;

    Ok(password_hash.to_string())
}

/// Verify a password against a stored PHC hash.
///
/// Recomputes the hash with the stored salt and compares; a mismatch is
/// `Ok(false)`, a malformed stored hash is an error.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| PasswordError::InvalidHashFormat(e.to_string()))?;

    let argon2 = Argon2::default();

    match argon2.verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerificationFailed(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_produces_phc_string() {
        let hash = hash_password("hunter2hunter2").expect("Failed to hash password");

        assert!(hash.starts_with("$argon2id$"));
        assert!(hash.contains("v=19"));
        assert!(hash.contains("m="));
        assert!(hash.contains("t="));
    }

    #[test]
    fn verify_correct_password() {
        let hash = hash_password("CorrectHorse9!").expect("Failed to hash password");

        assert!(verify_password("CorrectHorse9!", &hash).expect("Verification failed"));
    }

    #[test]
    fn verify_wrong_password() {
        let hash = hash_password("CorrectHorse9!").expect("Failed to hash password");

        assert!(!verify_password("WrongHorse9!", &hash).expect("Verification failed"));
    }

    #[test]
    fn verify_rejects_garbage_hash() {
        let result = verify_password("anything", "not-a-phc-string");
        assert!(matches!(result, Err(PasswordError::InvalidHashFormat(_))));
    }

    #[test]
    fn same_password_different_salts() {
        let hash1 = hash_password("repeatable").expect("Failed to hash password");
        let hash2 = hash_password("repeatable").expect("Failed to hash password");

        assert_ne!(hash1, hash2, "Hashes should differ due to random salts");
        assert!(verify_password("repeatable", &hash1).unwrap());
        assert!(verify_password("repeatable", &hash2).unwrap());
    }

    #[test]
    fn verify_is_case_sensitive() {
        let hash = hash_password("MixedCase").expect("Failed to hash password");

        assert!(verify_password("MixedCase", &hash).unwrap());
        assert!(!verify_password("mixedcase", &hash).unwrap());
    }
}
