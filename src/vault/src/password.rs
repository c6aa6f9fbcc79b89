//! Argon2id password hashing
//!
//! Hashes are stored as PHC strings, which carry algorithm, parameters and
//! salt, so changing [`PasswordConfig`] never invalidates existing records.

use crate::config::PasswordConfig;
use crate::error::{Result, VaultError};
use argon2::password_hash::{
    rand_core::OsRng, Error as HashError, PasswordHash, PasswordHasher, PasswordVerifier,
    SaltString,
};
use argon2::{Algorithm, Argon2, Params, Version};
use gatehouse_core::secret;

/// Salted, memory-hard password hashing
#[derive(Clone)]
pub struct PasswordScheme {
    argon2: Argon2<'static>,
    /// Hash of a random throwaway password, verified against when the
    /// account does not exist so both paths cost one hash evaluation
    dummy_hash: String,
}

impl PasswordScheme {
    pub fn new(config: PasswordConfig) -> Result<Self> {
        let params = Params::new(config.memory_kib, config.iterations, config.parallelism, None)
            .map_err(|e| VaultError::Hash(format!("invalid argon2 parameters: {}", e)))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut scheme = Self {
            argon2,
            dummy_hash: String::new(),
        };
        scheme.dummy_hash = scheme.hash(&secret::generate_random_string(24)?)?;
        Ok(scheme)
    }

    /// Hash a password with a fresh random salt
    pub fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| VaultError::Hash(e.to_string()))?;
        Ok(hash.to_string())
    }

    /// Check a password against a stored PHC string.
    ///
    /// Mismatch is `InvalidCredential`; an unparsable stored hash is
    /// `Corruption`.
    pub fn verify(&self, password: &str, stored: &str) -> Result<()> {
        let parsed = PasswordHash::new(stored)
            .map_err(|e| VaultError::Corruption(format!("stored password hash: {}", e)))?;

        match self.argon2.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(()),
            Err(HashError::Password) => Err(VaultError::InvalidCredential),
            Err(e) => Err(VaultError::Hash(e.to_string())),
        }
    }

    /// Spend one verification on the dummy hash and discard the result
    pub fn verify_dummy(&self, password: &str) {
        let _ = self.verify(password, &self.dummy_hash);
    }
}
