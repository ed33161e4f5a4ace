//! Password value object.
//!
//! Argon2id hashing with a random salt per password. Plain text never leaves
//! this module; callers store and compare the PHC string only.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::constants::MIN_PASSWORD_LENGTH;
use crate::error::{DomainError, DomainResult};

/// Hashed password.
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
    /// Hash a plain text password.
    ///
    /// # Errors
    /// Returns a password error if it is shorter than [`MIN_PASSWORD_LENGTH`].
    pub fn new(plain_text: &str) -> DomainResult<Self> {
        if plain_text.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(DomainError::password(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }

        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(plain_text.as_bytes(), &salt)
            .map_err(|e| DomainError::internal(format!("Password hash failed: {}", e)))?
            .to_string();

        Ok(Self { hash })
    }

    /// Wrap a hash loaded from storage.
    pub fn from_hash(hash: impl Into<String>) -> Self {
        Self { hash: hash.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.hash
    }

    pub fn into_string(self) -> String {
        self.hash
    }

    /// Check a plain text candidate. Malformed stored hashes never verify.
    pub fn verify(&self, plain_text: &str) -> bool {
        PasswordHash::new(&self.hash)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(plain_text.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let password = Password::new("parcel-secret-1").unwrap();

        assert!(password.verify("parcel-secret-1"));
        assert!(!password.verify("parcel-secret-2"));
    }

    #[test]
    fn restored_hash_still_verifies() {
        let password = Password::new("TestPassword123").unwrap();
        let restored = Password::from_hash(password.as_str());

        assert!(restored.verify("TestPassword123"));
    }

    #[test]
    fn same_input_gets_fresh_salt() {
        let first = Password::new("SamePassword123").unwrap();
        let second = Password::new("SamePassword123").unwrap();

        assert_ne!(first.as_str(), second.as_str());
    }

    #[test]
    fn short_password_rejected() {
        assert!(matches!(
            Password::new("short"),
            Err(DomainError::Password(_))
        ));
        assert!(Password::new("12345678").is_ok());
    }

    #[test]
    fn garbage_hash_never_verifies() {
        assert!(!Password::from_hash("not-a-phc-string").verify("anything"));
    }

    #[test]
    fn debug_output_hides_hash() {
        let password = Password::new("DebugPassword1").unwrap();
        assert!(!format!("{:?}", password).contains("argon2"));
    }
}
