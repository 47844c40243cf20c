//! Rows returned by the backing services.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Repository identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RepoId(pub i32);

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fully resolved commit identifier (40 hex characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommitId(pub String);

impl CommitId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form used in display strings.
    pub fn short(&self) -> &str {
        let end = self.0.len().min(7);
        // Commit IDs are ASCII hex, so byte slicing stays on a char boundary.
        self.0.get(..end).unwrap_or(&self.0)
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A repository as stored in the repository store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub id: RepoId,
    pub name: String,
}

impl Repository {
    pub fn new(id: i32, name: impl Into<String>) -> Self {
        Self {
            id: RepoId(id),
            name: name.into(),
        }
    }
}

/// A code intelligence upload record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upload {
    pub id: i64,
    pub repository_id: RepoId,
    /// Commit the upload was produced for.
    pub commit: String,
    /// Directory under which the upload applies.
    pub root: String,
    pub indexer: String,
    /// Backing state: uploading, queued, processing, errored, completed,
    /// deleting or deleted.
    pub state: String,
    pub uploaded_at: DateTime<Utc>,
    /// Whether the upload is visible from the tip of the default branch.
    pub visible_at_tip: bool,
    /// The auto-index job that produced this upload, if any.
    pub associated_index_id: Option<i64>,
}

/// An auto-indexing job record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub id: i64,
    pub repository_id: RepoId,
    pub commit: String,
    pub root: String,
    pub indexer: String,
    /// Backing state: queued, processing, errored or completed.
    pub state: String,
    pub queued_at: DateTime<Utc>,
    /// The upload produced by this job once it completed, if any.
    pub associated_upload_id: Option<i64>,
}
