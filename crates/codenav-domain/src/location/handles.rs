//! Resolved location handles.

use std::sync::Arc;
use std::time::Duration;

use codenav_storage::{CommitId, GitService, RepoId, Repository};
use tokio::sync::OnceCell;

use crate::backend::bounded;
use crate::error::{DomainError, DomainResult};

/// A resolved repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryHandle {
    pub id: RepoId,
    pub name: String,
}

impl RepositoryHandle {
    pub fn url(&self) -> String {
        format!("/{}", self.name)
    }
}

impl From<Repository> for RepositoryHandle {
    fn from(repo: Repository) -> Self {
        Self {
            id: repo.id,
            name: repo.name,
        }
    }
}

/// A resolved commit within a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitHandle {
    pub repository: Arc<RepositoryHandle>,
    /// The revision as requested (branch, tag or hash).
    pub rev: String,
    /// The commit the revision resolved to.
    pub oid: CommitId,
}

impl CommitHandle {
    pub fn url(&self) -> String {
        format!("{}/-/commit/{}", self.repository.url(), self.oid)
    }
}

/// A file or directory at a resolved commit.
///
/// Content is read from the revision-control service on first access and kept
/// for the lifetime of the entry.
pub struct PathEntry {
    commit: Arc<CommitHandle>,
    path: String,
    is_dir: bool,
    git: Arc<dyn GitService>,
    timeout: Duration,
    content: OnceCell<Vec<u8>>,
}

impl std::fmt::Debug for PathEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathEntry")
            .field("repository", &self.commit.repository.name)
            .field("commit", &self.commit.oid)
            .field("path", &self.path)
            .field("is_dir", &self.is_dir)
            .field("content_loaded", &self.content.initialized())
            .finish()
    }
}

impl PathEntry {
    pub(crate) fn new(
        commit: Arc<CommitHandle>,
        path: String,
        is_dir: bool,
        git: Arc<dyn GitService>,
        timeout: Duration,
    ) -> Self {
        Self {
            commit,
            path,
            is_dir,
            git,
            timeout,
            content: OnceCell::new(),
        }
    }

    pub fn commit(&self) -> &Arc<CommitHandle> {
        &self.commit
    }

    pub fn repository(&self) -> &Arc<RepositoryHandle> {
        &self.commit.repository
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    /// Last path component.
    pub fn name(&self) -> &str {
        self.path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
    }

    pub fn url(&self) -> String {
        let kind = if self.is_dir { "tree" } else { "blob" };
        format!(
            "{}@{}/-/{}/{}",
            self.commit.repository.url(),
            self.commit.rev,
            kind,
            self.path
        )
    }

    /// Returns the file content, reading it on first call.
    ///
    /// Directories have no content and never touch the backend. A failed read
    /// is not memoized; the next call reads again.
    pub async fn content(&self) -> DomainResult<&[u8]> {
        if self.is_dir {
            return Ok(&[]);
        }
        let content = self
            .content
            .get_or_try_init(|| async {
                let repo_name = &self.commit.repository.name;
                let content = bounded(
                    self.timeout,
                    self.git.read_file(repo_name, &self.commit.oid, &self.path),
                )
                .await??;
                Ok::<_, DomainError>(content)
            })
            .await?;
        Ok(content.as_slice())
    }
}
