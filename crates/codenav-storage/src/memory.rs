//! In-memory backing service implementations for testing.
//!
//! Every store counts the calls it receives and can be told to fail the next
//! N calls or to delay each call, which is what the resolution layer's tests
//! use to observe batching, negative caching and error propagation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::instrument;

use crate::error::{StorageError, StorageResult};
use crate::models::{CommitId, Index, RepoId, Repository, Upload};
use crate::traits::{GitService, ListOptions, PagedRecords, Record, RecordStore, RepositoryStore};

/// Call accounting and fault injection shared by the in-memory stores.
#[derive(Debug, Default)]
struct Instrumentation {
    failures_remaining: AtomicUsize,
    latency: Option<Duration>,
}

impl Instrumentation {
    /// Applies configured latency, then fails if a failure is pending.
    async fn enter(&self, operation: &str) -> StorageResult<()> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let should_fail = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(StorageError::ConnectionError {
                message: format!("injected failure in {operation}"),
            });
        }
        Ok(())
    }
}

/// In-memory implementation of [`RepositoryStore`].
#[derive(Debug, Default)]
pub struct MemoryRepositoryStore {
    repositories: DashMap<RepoId, Repository>,
    get_by_id_calls: AtomicUsize,
    instrumentation: Instrumentation,
}

impl MemoryRepositoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new store wrapped in Arc.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Delays every call by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.instrumentation.latency = Some(latency);
        self
    }

    pub fn insert(&self, repository: Repository) {
        self.repositories.insert(repository.id, repository);
    }

    /// Makes the next `n` calls fail with a connection error.
    pub fn fail_next(&self, n: usize) {
        self.instrumentation
            .failures_remaining
            .store(n, Ordering::SeqCst);
    }

    pub fn get_by_id_calls(&self) -> usize {
        self.get_by_id_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RepositoryStore for MemoryRepositoryStore {
    #[instrument(skip(self), fields(repo_id = %id))]
    async fn get_by_id(&self, id: RepoId) -> StorageResult<Repository> {
        self.get_by_id_calls.fetch_add(1, Ordering::SeqCst);
        self.instrumentation.enter("get_by_id").await?;

        self.repositories
            .get(&id)
            .map(|r| r.value().clone())
            .ok_or(StorageError::RepositoryNotFound { repo_id: id })
    }
}

/// In-memory implementation of [`GitService`].
#[derive(Debug, Default)]
pub struct MemoryGitService {
    /// (repo name, revision) -> commit.
    revisions: DashMap<(String, String), CommitId>,
    /// (repo name, commit, path) -> content.
    files: DashMap<(String, String, String), Vec<u8>>,
    resolve_calls: AtomicUsize,
    read_calls: AtomicUsize,
    instrumentation: Instrumentation,
}

impl MemoryGitService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.instrumentation.latency = Some(latency);
        self
    }

    /// Registers `rev` as resolving to `commit`. The full commit ID always
    /// resolves to itself as well.
    pub fn add_revision(&self, repo_name: &str, rev: &str, commit: &str) {
        let commit_id = CommitId(commit.to_string());
        self.revisions.insert(
            (repo_name.to_string(), rev.to_string()),
            commit_id.clone(),
        );
        self.revisions
            .insert((repo_name.to_string(), commit.to_string()), commit_id);
    }

    pub fn add_file(&self, repo_name: &str, commit: &str, path: &str, content: impl Into<Vec<u8>>) {
        self.files.insert(
            (repo_name.to_string(), commit.to_string(), path.to_string()),
            content.into(),
        );
    }

    pub fn fail_next(&self, n: usize) {
        self.instrumentation
            .failures_remaining
            .store(n, Ordering::SeqCst);
    }

    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    pub fn read_calls(&self) -> usize {
        self.read_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GitService for MemoryGitService {
    #[instrument(skip(self))]
    async fn resolve_revision(&self, repo_name: &str, rev: &str) -> StorageResult<CommitId> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        self.instrumentation.enter("resolve_revision").await?;

        self.revisions
            .get(&(repo_name.to_string(), rev.to_string()))
            .map(|c| c.value().clone())
            .ok_or_else(|| StorageError::RevisionNotFound {
                repo_name: repo_name.to_string(),
                rev: rev.to_string(),
            })
    }

    #[instrument(skip(self, commit), fields(commit = %commit))]
    async fn read_file(
        &self,
        repo_name: &str,
        commit: &CommitId,
        path: &str,
    ) -> StorageResult<Vec<u8>> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        self.instrumentation.enter("read_file").await?;

        self.files
            .get(&(
                repo_name.to_string(),
                commit.as_str().to_string(),
                path.to_string(),
            ))
            .map(|f| f.value().clone())
            .ok_or_else(|| StorageError::PathNotFound {
                path: path.to_string(),
            })
    }
}

/// In-memory implementation of [`RecordStore`] for any record kind.
#[derive(Debug)]
pub struct MemoryRecordStore<R: Record> {
    records: DashMap<i64, R>,
    get_by_ids_calls: AtomicUsize,
    list_calls: AtomicUsize,
    /// Every ID batch passed to `get_by_ids`, in call order.
    batches: Mutex<Vec<Vec<i64>>>,
    /// Every options value passed to `get_paged_list`, in call order.
    list_requests: Mutex<Vec<ListOptions>>,
    instrumentation: Instrumentation,
}

/// In-memory upload store.
pub type MemoryUploadStore = MemoryRecordStore<Upload>;

/// In-memory index store.
pub type MemoryIndexStore = MemoryRecordStore<Index>;

impl<R: Record> Default for MemoryRecordStore<R> {
    fn default() -> Self {
        Self {
            records: DashMap::new(),
            get_by_ids_calls: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
            batches: Mutex::new(Vec::new()),
            list_requests: Mutex::new(Vec::new()),
            instrumentation: Instrumentation::default(),
        }
    }
}

impl<R: Record> MemoryRecordStore<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.instrumentation.latency = Some(latency);
        self
    }

    pub fn insert(&self, record: R) {
        self.records.insert(record.id(), record);
    }

    pub fn fail_next(&self, n: usize) {
        self.instrumentation
            .failures_remaining
            .store(n, Ordering::SeqCst);
    }

    pub fn get_by_ids_calls(&self) -> usize {
        self.get_by_ids_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Returns the ID batches requested so far, each sorted ascending.
    pub async fn batches(&self) -> Vec<Vec<i64>> {
        self.batches.lock().await.clone()
    }

    pub async fn list_requests(&self) -> Vec<ListOptions> {
        self.list_requests.lock().await.clone()
    }
}

#[async_trait]
impl<R: Record> RecordStore<R> for MemoryRecordStore<R> {
    #[instrument(skip(self), fields(batch_size = ids.len()))]
    async fn get_by_ids(&self, ids: &[i64]) -> StorageResult<Vec<R>> {
        self.get_by_ids_calls.fetch_add(1, Ordering::SeqCst);
        let mut batch = ids.to_vec();
        batch.sort_unstable();
        self.batches.lock().await.push(batch);
        self.instrumentation.enter("get_by_ids").await?;

        Ok(ids
            .iter()
            .filter_map(|id| self.records.get(id).map(|r| r.value().clone()))
            .collect())
    }

    #[instrument(skip(self), fields(offset = options.offset, limit = options.limit))]
    async fn get_paged_list(&self, options: &ListOptions) -> StorageResult<PagedRecords<R>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.list_requests.lock().await.push(options.clone());
        self.instrumentation.enter("get_paged_list").await?;

        let mut matching: Vec<R> = self
            .records
            .iter()
            .filter(|r| options.matches(r.value()))
            .map(|r| r.value().clone())
            .collect();

        // Newest first; ties broken by ID descending so pages are stable.
        matching.sort_by(|a, b| {
            b.sort_timestamp()
                .cmp(&a.sort_timestamp())
                .then_with(|| b.id().cmp(&a.id()))
        });

        let total_count = matching.len();
        let records = matching
            .into_iter()
            .skip(options.offset)
            .take(options.limit)
            .collect();

        Ok(PagedRecords {
            records,
            total_count,
        })
    }
}
