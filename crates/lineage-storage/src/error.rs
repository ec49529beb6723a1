//! Storage error types.

use thiserror::Error;

/// Storage-specific errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No record exists for this person version.
    #[error("version not found: {person_hash} v{version}")]
    VersionNotFound { person_hash: String, version: u64 },

    /// Invalid input error.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// Fixture could not be read or parsed.
    #[error("fixture error: {message}")]
    Fixture { message: String },
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
