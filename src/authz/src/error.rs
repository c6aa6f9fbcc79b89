//! Error types for the permission engine and request authorizer

use gatehouse_core::CoreError;
use gatehouse_vault::VaultError;
use thiserror::Error;

/// Authorization subsystem errors.
///
/// A denied request is never one of these; denial is an [`AccessDecision`].
///
/// [`AccessDecision`]: crate::authorizer::AccessDecision
#[derive(Debug, Error)]
pub enum AuthzError {
    /// Malformed resource pattern, empty action set, non-absolute path
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Policy persistence failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Persisted policy could not be decoded
    #[error("Corrupted policy: {0}")]
    Corruption(String),

    /// Session capability failure
    #[error("Session error: {0}")]
    Session(String),

    /// Login rejected; unknown user and wrong password are not distinguished
    #[error("Authentication failed")]
    AuthenticationFailed,

    /// Credential store error
    #[error("Vault error: {0}")]
    Vault(#[from] VaultError),
}

impl From<sled::Error> for AuthzError {
    fn from(err: sled::Error) -> Self {
        AuthzError::Storage(err.to_string())
    }
}

impl From<CoreError> for AuthzError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Codec(msg) => AuthzError::Corruption(msg),
            CoreError::Random(msg) => AuthzError::Session(msg),
            CoreError::Invalid(msg) => AuthzError::InvalidInput(msg),
        }
    }
}

/// Result type for authorization operations
pub type Result<T> = std::result::Result<T, AuthzError>;
