//! Error types for the settlement notifier

use thiserror::Error;

/// Result type for settlement operations
pub type Result<T> = std::result::Result<T, Error>;

/// Settlement errors
///
/// Delivery failure against the external API is not an error: it is a
/// recorded outcome ([`crate::notifier::DeadLetter`]) so that it can
/// never leak back into the ledger path.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP client construction failure
    #[error("HTTP client error: {0}")]
    Client(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

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
