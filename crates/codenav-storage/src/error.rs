//! Storage error types.

use thiserror::Error;

use crate::models::RepoId;

/// Errors returned by the backing services.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// Repository not found.
    #[error("repository not found: {repo_id}")]
    RepositoryNotFound { repo_id: RepoId },

    /// Revision could not be resolved in the repository.
    #[error("revision not found: {repo_name}@{rev}")]
    RevisionNotFound { repo_name: String, rev: String },

    /// Path does not exist at the given commit.
    #[error("path not found: {path}")]
    PathNotFound { path: String },

    /// Backing service connection error.
    #[error("connection error: {message}")]
    ConnectionError { message: String },

    /// Backing service query error.
    #[error("query error: {message}")]
    QueryError { message: String },

    /// Internal error.
    #[error("internal storage error: {message}")]
    InternalError { message: String },
}

impl StorageError {
    /// Returns true for the "does not exist" kinds.
    ///
    /// Callers in the resolution layer turn these into absent results
    /// instead of propagating them.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StorageError::RepositoryNotFound { .. }
                | StorageError::RevisionNotFound { .. }
                | StorageError::PathNotFound { .. }
        )
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
