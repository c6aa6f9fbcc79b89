//! Error types for the vault module

use gatehouse_core::CoreError;
use sled::transaction::TransactionError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, VaultError>;

#[derive(Debug, Error)]
pub enum VaultError {
    /// No credential stored under the given name or key
    #[error("Not found: {0}")]
    NotFound(String),

    /// Create attempted on an existing name or key
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Password or key did not match
    #[error("Invalid credential")]
    InvalidCredential,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A stored record could not be decoded
    #[error("Corrupted record: {0}")]
    Corruption(String),

    #[error("Storage error: {0}")]
    Storage(#[from] sled::Error),

    #[error("Password hashing error: {0}")]
    Hash(String),

    #[error("Random source error: {0}")]
    Random(String),
}

impl VaultError {
    /// True for the errors an authentication attempt may legitimately produce
    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, VaultError::NotFound(_) | VaultError::InvalidCredential)
    }

    /// Message safe to return to an unauthenticated caller.
    ///
    /// Unknown user and wrong password read the same, so the response cannot
    /// be used to enumerate accounts.
    pub fn public_message(&self) -> &'static str {
        match self {
            VaultError::NotFound(_) | VaultError::InvalidCredential => "authentication failed",
            VaultError::AlreadyExists(_) => "already exists",
            VaultError::InvalidInput(_) => "invalid input",
            VaultError::Corruption(_)
            | VaultError::Storage(_)
            | VaultError::Hash(_)
            | VaultError::Random(_) => "internal error",
        }
    }
}

impl From<CoreError> for VaultError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Codec(msg) => VaultError::Corruption(msg),
            CoreError::Random(msg) => VaultError::Random(msg),
            CoreError::Invalid(msg) => VaultError::InvalidInput(msg),
        }
    }
}

impl From<TransactionError<VaultError>> for VaultError {
    fn from(err: TransactionError<VaultError>) -> Self {
        match err {
            TransactionError::Abort(inner) => inner,
            TransactionError::Storage(e) => VaultError::Storage(e),
        }
    }
}
