//! Domain error types for resolution operations.

use codenav_storage::StorageError;
use thiserror::Error;

/// Errors surfaced to field resolvers.
///
/// Not-found outcomes are never errors at this layer; they resolve to `None`.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A backing call failed for a reason other than not-found.
    #[error("backing service error: {0}")]
    Storage(#[from] StorageError),

    /// A backing call did not complete within the configured timeout.
    #[error("timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// A pagination cursor could not be decoded.
    #[error("invalid cursor {cursor:?}: {message}")]
    InvalidCursor { cursor: String, message: String },

    /// A state filter named a state with no backing mapping.
    #[error("unknown state: {state}")]
    UnknownState { state: String },

    /// A page size outside the accepted range.
    #[error("invalid page size {page_size} (must be between 1 and {max})")]
    InvalidPageSize { page_size: usize, max: usize },
}

impl DomainError {
    /// Returns true for errors caused by the request itself rather than a backend.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            DomainError::InvalidCursor { .. }
                | DomainError::UnknownState { .. }
                | DomainError::InvalidPageSize { .. }
        )
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
