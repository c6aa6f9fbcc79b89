//! Error types shared by the Gatehouse crates

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error type
#[derive(Debug, Error)]
pub enum CoreError {
    /// A record could not be encoded or decoded
    #[error("Codec error: {0}")]
    Codec(String),

    /// The operating system random source failed
    #[error("Random source error: {0}")]
    Random(String),

    /// Invalid input
    #[error("Invalid: {0}")]
    Invalid(String),
}

impl CoreError {
    /// Create a codec error
    pub fn codec<S: Into<String>>(msg: S) -> Self {
        CoreError::Codec(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid<S: Into<String>>(msg: S) -> Self {
        CoreError::Invalid(msg.into())
    }
}
