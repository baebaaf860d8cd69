//! Error types for the treasury layer

use thiserror::Error;

/// Result type for treasury operations
pub type Result<T> = std::result::Result<T, Error>;

/// Treasury errors
#[derive(Error, Debug)]
pub enum Error {
    /// Ledger error
    #[error("Ledger error: {0}")]
    Ledger(#[from] ledger_core::Error),

    /// Transfer target unresolvable or equal to the sender
    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    /// Fee policy or site configuration unusable; aborts before any write
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Payment method unknown or inactive
    #[error("Unknown payment method: {0}")]
    UnknownMethod(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}
