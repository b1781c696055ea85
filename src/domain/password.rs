//! Argon2 password hashing.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use super::validation::validate_password;
use crate::errors::{AppError, AppResult};

/// Hashed password. The hash never shows up in debug output.
#[derive(Clone, PartialEq, Eq)]
pub struct Password {
    hash: String,
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Password")
            .field("hash", &"[REDACTED]")
            .finish()
    }
}

impl Password {
    /// Hash `plain_text` after checking the strength rules.
    pub fn new(plain_text: &str) -> AppResult<Self> {
        if let Some(message) = validate_password(plain_text) {
            return Err(AppError::validation(message));
        }

        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(plain_text.as_bytes(), &salt)
            .map_err(|e| AppError::internal(format!("Password hash failed: {}", e)))?
            .to_string();
        Ok(Self { hash })
    }

    pub fn from_hash(hash: String) -> Self {
        Self { hash }
    }

    pub fn as_str(&self) -> &str {
        &self.hash
    }

    pub fn into_string(self) -> String {
        self.hash
    }

    /// A malformed stored hash never verifies.
    pub fn verify(&self, plain_text: &str) -> bool {
        match PasswordHash::new(&self.hash) {
            Ok(parsed) => Argon2::default()
                .verify_password(plain_text.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                tracing::warn!("Stored password hash is malformed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_and_verify() {
        let password = Password::new("Abcd1234!").unwrap();

        assert!(password.verify("Abcd1234!"));
        assert!(!password.verify("Abcd1234?"));
    }

    #[test]
    fn test_password_from_hash() {
        let hash = Password::new("Secure#Pass9").unwrap().into_string();
        assert!(Password::from_hash(hash).verify("Secure#Pass9"));
    }

    #[test]
    fn test_same_password_different_salts() {
        let first = Password::new("Secure#Pass9").unwrap();
        let second = Password::new("Secure#Pass9").unwrap();
        assert_ne!(first.as_str(), second.as_str());
    }

    #[test]
    fn test_weak_password_rejected() {
        let err = Password::new("abcdefgh").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Password must contain at least one uppercase letter"
        );
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        assert!(!Password::from_hash("not-a-hash".into()).verify("anything"));
    }
}
