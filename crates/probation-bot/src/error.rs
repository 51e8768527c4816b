//! Error types for the probation bot.

use thiserror::Error;

/// Result type for bot operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the bot process.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or malformed startup configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Discord client error
    #[error("Discord error: {0}")]
    Discord(#[from] serenity::Error),

    /// Reconciliation or promotion error
    #[error(transparent)]
    Core(#[from] probation_core::Error),

    /// Log file setup error
    #[error("Logging error: {0}")]
    Logging(#[from] tracing_appender::rolling::InitError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rocksdb::Error> for Error {
    fn from(e: rocksdb::Error) -> Self {
        Error::Storage(e.to_string())
    }
}

impl From<Error> for probation_core::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Core(inner) => inner,
            other => probation_core::Error::Ledger(other.to_string()),
        }
    }
}
