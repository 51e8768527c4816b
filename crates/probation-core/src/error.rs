//! Error types for probation-core.

use std::time::Duration;
use thiserror::Error;

/// Result type for probation-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reconciling or promoting.
#[derive(Debug, Error)]
pub enum Error {
    /// The ledger backend failed. Fatal for the current cycle.
    #[error("Ledger error: {0}")]
    Ledger(String),

    /// A periodic cycle did not finish in time.
    #[error("cycle timed out after {0:?}")]
    Timeout(Duration),
}
