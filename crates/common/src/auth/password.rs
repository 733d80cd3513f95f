//! Argon2 password hashing

use crate::errors::{AppError, Result};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

/// Derive a salted PHC hash string from a plaintext password
pub fn hash(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal {
            message: format!("Failed to hash password: {}", e),
        })
}

/// Check a plaintext password against a stored hash; malformed hashes never match
pub fn verify(password: &str, hashword: &str) -> bool {
    PasswordHash::new(hashword)
        .ok()
        .as_ref()
        .map(|hash| {
            Argon2::default()
                .verify_password(password.as_bytes(), hash)
                .is_ok()
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hashword = hash("correct horse").unwrap();
        assert!(hashword.starts_with("$argon2"));
        assert!(!hashword.contains("correct horse"));
        assert!(verify("correct horse", &hashword));
        assert!(!verify("battery staple", &hashword));
    }

    #[test]
    fn test_hashes_are_salted() {
        assert_ne!(hash("same").unwrap(), hash("same").unwrap());
    }

    #[test]
    fn test_malformed_hash_never_matches() {
        assert!(!verify("anything", "not-a-phc-string"));
        assert!(!verify("", ""));
    }
}
