//! Password Hashing
//!
//! Argon2id hashing for stored credentials. The cost parameters come from
//! [`PasswordSettings`] so tests can run with a cheap configuration.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

use crate::config::PasswordSettings;
use crate::shared::error::RepositoryError;

/// Hashes and verifies user passwords.
#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
}

impl CredentialHasher {
    /// Build a hasher with explicit Argon2id cost parameters.
    pub fn new(settings: &PasswordSettings) -> Result<Self, RepositoryError> {
        let params = Params::new(
            settings.memory_kib,
            settings.iterations,
            settings.parallelism,
            None,
        )
        .map_err(|e| RepositoryError::Internal(format!("Invalid Argon2 parameters: {}", e)))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash a password using Argon2id with a fresh random salt.
    pub fn hash_password(&self, password: &str) -> Result<String, RepositoryError> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| RepositoryError::Internal(format!("Password hashing failed: {}", e)))
    }

    /// Verify a password against its stored hash.
    ///
    /// A hash that cannot be parsed is reported as corrupt rather than as a mismatch.
    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool, RepositoryError> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| RepositoryError::Corrupt(format!("Invalid password hash: {}", e)))?;

        Ok(self
            .argon2
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }
}

impl std::fmt::Debug for CredentialHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialHasher").finish_non_exhaustive()
    }
}
