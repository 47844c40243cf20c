//! Backing service trait definitions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StorageResult;
use crate::models::{CommitId, Index, RepoId, Repository, Upload};

/// Repository metadata store.
#[async_trait]
pub trait RepositoryStore: Send + Sync + 'static {
    /// Gets a repository by ID.
    ///
    /// Returns `StorageError::RepositoryNotFound` when no such repository exists.
    async fn get_by_id(&self, id: RepoId) -> StorageResult<Repository>;
}

/// Revision-control metadata service.
#[async_trait]
pub trait GitService: Send + Sync + 'static {
    /// Resolves a revision (branch, tag, abbreviated or full hash) to a commit ID.
    ///
    /// Returns `StorageError::RevisionNotFound` when the revision does not exist.
    async fn resolve_revision(&self, repo_name: &str, rev: &str) -> StorageResult<CommitId>;

    /// Reads the content of a file at a commit.
    async fn read_file(
        &self,
        repo_name: &str,
        commit: &CommitId,
        path: &str,
    ) -> StorageResult<Vec<u8>>;
}

/// A row that can be fetched by integer ID and listed in pages.
pub trait Record: Clone + Send + Sync + 'static {
    /// The row's own identifier.
    fn id(&self) -> i64;

    /// Timestamp used for descending list order.
    fn sort_timestamp(&self) -> DateTime<Utc>;

    /// Backing state string.
    fn state(&self) -> &str;

    fn repository_id(&self) -> RepoId;

    /// Case-insensitive match of `term` against the searchable fields.
    fn matches_term(&self, term: &str) -> bool;

    /// Whether the row is visible from the tip of its repository's default branch.
    fn is_latest_for_repo(&self) -> bool;
}

impl Record for Upload {
    fn id(&self) -> i64 {
        self.id
    }

    fn sort_timestamp(&self) -> DateTime<Utc> {
        self.uploaded_at
    }

    fn state(&self) -> &str {
        &self.state
    }

    fn repository_id(&self) -> RepoId {
        self.repository_id
    }

    fn matches_term(&self, term: &str) -> bool {
        term_matches(term, &[&self.commit, &self.root, &self.indexer])
    }

    fn is_latest_for_repo(&self) -> bool {
        self.visible_at_tip
    }
}

impl Record for Index {
    fn id(&self) -> i64 {
        self.id
    }

    fn sort_timestamp(&self) -> DateTime<Utc> {
        self.queued_at
    }

    fn state(&self) -> &str {
        &self.state
    }

    fn repository_id(&self) -> RepoId {
        self.repository_id
    }

    fn matches_term(&self, term: &str) -> bool {
        term_matches(term, &[&self.commit, &self.root, &self.indexer])
    }

    fn is_latest_for_repo(&self) -> bool {
        // Index jobs are never reachable from a branch tip; only their uploads are.
        false
    }
}

fn term_matches(term: &str, fields: &[&str]) -> bool {
    let term = term.to_lowercase();
    fields.iter().any(|f| f.to_lowercase().contains(&term))
}

/// Filter and window for a paged list query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Restrict to a single repository.
    pub repository_id: Option<RepoId>,
    /// Backing states to include. Empty means all states.
    pub states: Vec<String>,
    /// Free-text search term.
    pub term: Option<String>,
    /// Restrict to rows visible from the tip of the default branch.
    pub is_latest_for_repo: Option<bool>,
    /// Number of matching rows to skip.
    pub offset: usize,
    /// Maximum number of rows to return.
    pub limit: usize,
}

impl ListOptions {
    /// Returns true when `record` passes every filter (ignoring the window).
    pub fn matches<R: Record>(&self, record: &R) -> bool {
        if let Some(repo_id) = self.repository_id {
            if record.repository_id() != repo_id {
                return false;
            }
        }
        if !self.states.is_empty() && !self.states.iter().any(|s| s == record.state()) {
            return false;
        }
        if let Some(term) = self.term.as_deref() {
            if !term.is_empty() && !record.matches_term(term) {
                return false;
            }
        }
        if let Some(latest) = self.is_latest_for_repo {
            if record.is_latest_for_repo() != latest {
                return false;
            }
        }
        true
    }
}

/// One page of rows plus the total number of rows matching the filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagedRecords<R> {
    pub records: Vec<R>,
    pub total_count: usize,
}

/// Record store for one record kind.
#[async_trait]
pub trait RecordStore<R: Record>: Send + Sync + 'static {
    /// Fetches every row whose ID is in `ids`. Missing IDs are omitted.
    async fn get_by_ids(&self, ids: &[i64]) -> StorageResult<Vec<R>>;

    /// Lists rows matching `options`, newest first by the record's sort timestamp.
    async fn get_paged_list(&self, options: &ListOptions) -> StorageResult<PagedRecords<R>>;
}
