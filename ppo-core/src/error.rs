//! Errors in the library.
use thiserror::Error;

/// Errors raised by the core types of the library.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The requested key does not exist in a [`Record`](crate::record::Record).
    #[error("Record key error: {0}")]
    RecordKeyError(String),

    /// The optimization loop was configured to run zero rounds or with empty batches.
    #[error("Invalid optimization setting: {0}")]
    InvalidOptSetting(String),
}
