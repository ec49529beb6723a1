//! Domain error types for lineage traversal.

use thiserror::Error;

/// Domain-specific errors for lineage traversal.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DomainError {
    /// The walk was cancelled through its cancellation token.
    ///
    /// Not a failure: callers use [`DomainError::is_aborted`] to suppress
    /// error reporting when the consumer walked away on purpose.
    #[error("operation aborted")]
    Aborted,

    /// Person hash is not a hex identifier of the expected length.
    #[error("invalid person hash: {value}")]
    InvalidPersonHash { value: String },

    /// Version indices start at 1.
    #[error("invalid version index {version} for {person_hash}")]
    InvalidVersion { person_hash: String, version: u64 },

    /// The relation reader failed and the fetch policy asked to fail the walk.
    #[error("relation read error: {message}")]
    RelationRead { message: String },

    /// Internal invariant violated (e.g. producer task panicked).
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl DomainError {
    /// Returns true for the cancellation signal.
    pub fn is_aborted(&self) -> bool {
        matches!(self, DomainError::Aborted)
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
