//! Hierarchical repository → commit → path cache.
//!
//! Each level is a map behind its own lock, nested inside the entry of the
//! level above it. A resolved repository is shared by every commit looked up
//! under it and a resolved commit by every path, so a request that touches
//! hundreds of paths in one commit resolves that repository and commit once.
//!
//! Negative results are memoized: a repository that does not exist (or a
//! revision that does not resolve) is stored as [`Resolution::Absent`] and all
//! lookups beneath it short-circuit without touching the backend again.
//!
//! Locks are taken one level at a time. Resolving a commit first resolves the
//! repository (acquiring and releasing the top-level lock) and only then takes
//! the repository's commit lock, so no lock is ever held while waiting on a
//! lock from another level.

mod handles;

pub use handles::{CommitHandle, PathEntry, RepositoryHandle};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use codenav_storage::{GitService, RepoId, RepositoryStore, StorageError};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use crate::backend::bounded;
use crate::config::ResolverConfig;
use crate::error::DomainResult;

/// Outcome of a resolution that has been attempted.
///
/// A key missing from a map has not been attempted yet; a key mapped to
/// `Absent` was looked up and does not exist.
#[derive(Debug, Clone)]
enum Resolution<T> {
    Absent,
    Present(T),
}

impl<T: Clone> Resolution<T> {
    fn get(&self) -> Option<T> {
        match self {
            Resolution::Absent => None,
            Resolution::Present(value) => Some(value.clone()),
        }
    }
}

struct RepoEntry {
    handle: Arc<RepositoryHandle>,
    commits: RwLock<HashMap<String, Resolution<Arc<CommitEntry>>>>,
}

struct CommitEntry {
    handle: Arc<CommitHandle>,
    paths: RwLock<HashMap<String, Arc<PathEntry>>>,
}

fn record_hit(level: &'static str) {
    metrics::counter!("codenav_location_cache_hits_total", "level" => level).increment(1);
}

fn record_miss(level: &'static str) {
    metrics::counter!("codenav_location_cache_misses_total", "level" => level).increment(1);
}

/// Per-request cache of resolved repositories, commits and paths.
pub struct LocationCache {
    repo_store: Arc<dyn RepositoryStore>,
    git: Arc<dyn GitService>,
    timeout: Duration,
    repositories: RwLock<HashMap<RepoId, Resolution<Arc<RepoEntry>>>>,
}

impl std::fmt::Debug for LocationCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocationCache")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl LocationCache {
    /// Creates an empty cache over the given backends.
    pub fn new(
        repo_store: Arc<dyn RepositoryStore>,
        git: Arc<dyn GitService>,
        config: &ResolverConfig,
    ) -> Self {
        Self {
            repo_store,
            git,
            timeout: config.backend_timeout,
            repositories: RwLock::new(HashMap::new()),
        }
    }

    /// Resolves a repository by ID.
    ///
    /// `Ok(None)` means the repository does not exist.
    pub async fn repository(&self, id: RepoId) -> DomainResult<Option<Arc<RepositoryHandle>>> {
        Ok(self
            .repo_entry(id)
            .await?
            .map(|entry| Arc::clone(&entry.handle)))
    }

    /// Resolves a revision within a repository.
    ///
    /// `Ok(None)` means the repository does not exist or the revision does not
    /// resolve in it.
    pub async fn commit(
        &self,
        repo_id: RepoId,
        rev: &str,
    ) -> DomainResult<Option<Arc<CommitHandle>>> {
        Ok(self
            .commit_entry(repo_id, rev)
            .await?
            .map(|entry| Arc::clone(&entry.handle)))
    }

    /// Resolves a path at a revision. No backing call is made for the path
    /// itself; content is read lazily by the returned entry.
    ///
    /// The first lookup of a path decides its `is_dir` flag for the request.
    pub async fn path(
        &self,
        repo_id: RepoId,
        rev: &str,
        path: &str,
        is_dir: bool,
    ) -> DomainResult<Option<Arc<PathEntry>>> {
        let Some(commit) = self.commit_entry(repo_id, rev).await? else {
            return Ok(None);
        };

        if let Some(entry) = commit.paths.read().await.get(path) {
            record_hit("path");
            return Ok(Some(Arc::clone(entry)));
        }

        let mut paths = commit.paths.write().await;
        if let Some(entry) = paths.get(path) {
            record_hit("path");
            return Ok(Some(Arc::clone(entry)));
        }
        record_miss("path");

        let entry = Arc::new(PathEntry::new(
            Arc::clone(&commit.handle),
            path.to_string(),
            is_dir,
            Arc::clone(&self.git),
            self.timeout,
        ));
        paths.insert(path.to_string(), Arc::clone(&entry));
        Ok(Some(entry))
    }

    #[instrument(skip(self))]
    async fn repo_entry(&self, id: RepoId) -> DomainResult<Option<Arc<RepoEntry>>> {
        if let Some(resolution) = self.repositories.read().await.get(&id) {
            record_hit("repository");
            return Ok(resolution.get());
        }

        let mut repositories = self.repositories.write().await;
        // Re-check: a concurrent caller may have resolved it while we waited.
        if let Some(resolution) = repositories.get(&id) {
            record_hit("repository");
            return Ok(resolution.get());
        }
        record_miss("repository");

        let resolution = match bounded(self.timeout, self.repo_store.get_by_id(id)).await? {
            Ok(repo) => Resolution::Present(Arc::new(RepoEntry {
                handle: Arc::new(RepositoryHandle::from(repo)),
                commits: RwLock::new(HashMap::new()),
            })),
            Err(StorageError::RepositoryNotFound { .. }) => {
                debug!("repository not found");
                Resolution::Absent
            }
            Err(err) => {
                warn!(error = %err, "repository lookup failed");
                return Err(err.into());
            }
        };

        let result = resolution.get();
        repositories.insert(id, resolution);
        Ok(result)
    }

    #[instrument(skip(self))]
    async fn commit_entry(
        &self,
        repo_id: RepoId,
        rev: &str,
    ) -> DomainResult<Option<Arc<CommitEntry>>> {
        let Some(repo) = self.repo_entry(repo_id).await? else {
            return Ok(None);
        };

        if let Some(resolution) = repo.commits.read().await.get(rev) {
            record_hit("commit");
            return Ok(resolution.get());
        }

        let mut commits = repo.commits.write().await;
        if let Some(resolution) = commits.get(rev) {
            record_hit("commit");
            return Ok(resolution.get());
        }
        record_miss("commit");

        let resolved = bounded(
            self.timeout,
            self.git.resolve_revision(&repo.handle.name, rev),
        )
        .await?;
        let resolution = match resolved {
            Ok(oid) => Resolution::Present(Arc::new(CommitEntry {
                handle: Arc::new(CommitHandle {
                    repository: Arc::clone(&repo.handle),
                    rev: rev.to_string(),
                    oid,
                }),
                paths: RwLock::new(HashMap::new()),
            })),
            Err(StorageError::RevisionNotFound { .. }) => {
                debug!("revision not found");
                Resolution::Absent
            }
            Err(err) => {
                warn!(error = %err, "revision resolution failed");
                return Err(err.into());
            }
        };

        let result = resolution.get();
        commits.insert(rev.to_string(), resolution);
        Ok(result)
    }
}

#[cfg(test)]
mod tests;
