//! Tests for the hierarchical location cache.

use std::sync::Arc;
use std::time::Duration;

use codenav_storage::{MemoryGitService, MemoryRepositoryStore, RepoId, Repository, StorageError};

use super::*;
use crate::error::DomainError;

const REPO: &str = "github.com/sourcegraph/conc";

fn commit_a() -> String {
    "a".repeat(40)
}

fn commit_b() -> String {
    "b".repeat(40)
}

struct Fixture {
    repos: Arc<MemoryRepositoryStore>,
    git: Arc<MemoryGitService>,
}

impl Fixture {
    fn new() -> Self {
        Self::with_backends(MemoryRepositoryStore::new(), MemoryGitService::new())
    }

    fn with_backends(repos: MemoryRepositoryStore, git: MemoryGitService) -> Self {
        repos.insert(Repository::new(1, REPO));
        git.add_revision(REPO, "main", &commit_a());
        git.add_revision(REPO, "v1.0.0", &commit_b());
        git.add_file(REPO, &commit_a(), "README.md", "# conc\n");
        Self {
            repos: Arc::new(repos),
            git: Arc::new(git),
        }
    }

    fn cache(&self) -> LocationCache {
        self.cache_with(&ResolverConfig::default())
    }

    fn cache_with(&self, config: &ResolverConfig) -> LocationCache {
        LocationCache::new(self.repos.clone(), self.git.clone(), config)
    }
}

// ========== Section 1: Repository level ==========

#[tokio::test]
async fn test_repository_is_fetched_once() {
    let fixture = Fixture::new();
    let cache = fixture.cache();

    let first = cache.repository(RepoId(1)).await.unwrap().unwrap();
    let second = cache.repository(RepoId(1)).await.unwrap().unwrap();

    assert_eq!(first.name, REPO);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(fixture.repos.get_by_id_calls(), 1);
}

#[tokio::test]
async fn test_missing_repository_is_memoized_as_none() {
    let fixture = Fixture::new();
    let cache = fixture.cache();

    assert!(cache.repository(RepoId(404)).await.unwrap().is_none());
    assert!(cache.repository(RepoId(404)).await.unwrap().is_none());
    assert_eq!(fixture.repos.get_by_id_calls(), 1);
}

#[tokio::test]
async fn test_repository_error_is_not_cached() {
    let fixture = Fixture::new();
    let cache = fixture.cache();
    fixture.repos.fail_next(1);

    let err = cache.repository(RepoId(1)).await.unwrap_err();
    assert!(matches!(
        err,
        DomainError::Storage(StorageError::ConnectionError { .. })
    ));

    assert!(cache.repository(RepoId(1)).await.unwrap().is_some());
    assert_eq!(fixture.repos.get_by_id_calls(), 2);
}

// ========== Section 2: Commit level ==========

#[tokio::test]
async fn test_commit_resolves_revision_once() {
    let fixture = Fixture::new();
    let cache = fixture.cache();

    let first = cache.commit(RepoId(1), "main").await.unwrap().unwrap();
    let second = cache.commit(RepoId(1), "main").await.unwrap().unwrap();

    assert_eq!(first.oid.as_str(), commit_a());
    assert_eq!(first.rev, "main");
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(fixture.git.resolve_calls(), 1);
    assert_eq!(fixture.repos.get_by_id_calls(), 1);
}

#[tokio::test]
async fn test_commits_share_parent_repository() {
    let fixture = Fixture::new();
    let cache = fixture.cache();

    let main = cache.commit(RepoId(1), "main").await.unwrap().unwrap();
    let tag = cache.commit(RepoId(1), "v1.0.0").await.unwrap().unwrap();

    assert!(Arc::ptr_eq(&main.repository, &tag.repository));
    assert_eq!(fixture.repos.get_by_id_calls(), 1);
    assert_eq!(fixture.git.resolve_calls(), 2);
}

#[tokio::test]
async fn test_commit_under_missing_repository_skips_revision_service() {
    let fixture = Fixture::new();
    let cache = fixture.cache();

    assert!(cache.repository(RepoId(404)).await.unwrap().is_none());
    assert!(cache.commit(RepoId(404), "main").await.unwrap().is_none());
    assert!(cache.commit(RepoId(404), "other").await.unwrap().is_none());

    assert_eq!(fixture.git.resolve_calls(), 0);
    assert_eq!(fixture.repos.get_by_id_calls(), 1);
}

#[tokio::test]
async fn test_unknown_revision_is_memoized_as_none() {
    let fixture = Fixture::new();
    let cache = fixture.cache();

    assert!(cache.commit(RepoId(1), "nope").await.unwrap().is_none());
    assert!(cache.commit(RepoId(1), "nope").await.unwrap().is_none());
    assert_eq!(fixture.git.resolve_calls(), 1);
}

#[tokio::test]
async fn test_revision_service_error_propagates_and_retries() {
    let fixture = Fixture::new();
    let cache = fixture.cache();
    fixture.git.fail_next(1);

    assert!(cache.commit(RepoId(1), "main").await.is_err());
    assert!(cache.commit(RepoId(1), "main").await.unwrap().is_some());
    assert_eq!(fixture.git.resolve_calls(), 2);
    // The repository resolved fine the first time and stays cached.
    assert_eq!(fixture.repos.get_by_id_calls(), 1);
}

// ========== Section 3: Path level ==========

#[tokio::test]
async fn test_path_is_memoized_without_backing_calls() {
    let fixture = Fixture::new();
    let cache = fixture.cache();

    let first = cache
        .path(RepoId(1), "main", "README.md", false)
        .await
        .unwrap()
        .unwrap();
    let second = cache
        .path(RepoId(1), "main", "README.md", false)
        .await
        .unwrap()
        .unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.name(), "README.md");
    assert_eq!(
        first.url(),
        format!("/{REPO}@main/-/blob/README.md"),
    );
    assert_eq!(fixture.git.resolve_calls(), 1);
    assert_eq!(fixture.git.read_calls(), 0, "content is lazy");
}

#[tokio::test]
async fn test_paths_share_parent_commit() {
    let fixture = Fixture::new();
    let cache = fixture.cache();

    let readme = cache
        .path(RepoId(1), "main", "README.md", false)
        .await
        .unwrap()
        .unwrap();
    let src = cache
        .path(RepoId(1), "main", "src/", true)
        .await
        .unwrap()
        .unwrap();

    assert!(Arc::ptr_eq(readme.commit(), src.commit()));
    assert_eq!(src.name(), "src");
    assert_eq!(fixture.git.resolve_calls(), 1);
}

#[tokio::test]
async fn test_path_under_missing_commit_short_circuits() {
    let fixture = Fixture::new();
    let cache = fixture.cache();

    assert!(cache.commit(RepoId(1), "nope").await.unwrap().is_none());
    assert!(cache
        .path(RepoId(1), "nope", "README.md", false)
        .await
        .unwrap()
        .is_none());
    assert!(cache
        .path(RepoId(404), "main", "README.md", false)
        .await
        .unwrap()
        .is_none());

    assert_eq!(fixture.git.resolve_calls(), 1);
    assert_eq!(fixture.git.read_calls(), 0);
}

#[tokio::test]
async fn test_path_content_is_read_once() {
    let fixture = Fixture::new();
    let cache = fixture.cache();

    let entry = cache
        .path(RepoId(1), "main", "README.md", false)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(entry.content().await.unwrap(), b"# conc\n");
    assert_eq!(entry.content().await.unwrap(), b"# conc\n");
    assert_eq!(fixture.git.read_calls(), 1);
}

#[tokio::test]
async fn test_directory_content_is_empty_without_backing_call() {
    let fixture = Fixture::new();
    let cache = fixture.cache();

    let entry = cache
        .path(RepoId(1), "main", "src", true)
        .await
        .unwrap()
        .unwrap();

    assert!(entry.content().await.unwrap().is_empty());
    assert_eq!(fixture.git.read_calls(), 0);
}

#[tokio::test]
async fn test_failed_content_read_is_retried() {
    let fixture = Fixture::new();
    let cache = fixture.cache();
    let entry = cache
        .path(RepoId(1), "main", "README.md", false)
        .await
        .unwrap()
        .unwrap();

    fixture.git.fail_next(1);
    assert!(entry.content().await.is_err());
    assert_eq!(entry.content().await.unwrap(), b"# conc\n");
    assert_eq!(fixture.git.read_calls(), 2);
}

// ========== Section 4: Concurrency and timeouts ==========

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_path_lookups_resolve_each_level_once() {
    let fixture = Fixture::with_backends(
        MemoryRepositoryStore::new().with_latency(Duration::from_millis(10)),
        MemoryGitService::new().with_latency(Duration::from_millis(10)),
    );
    let cache = Arc::new(fixture.cache());

    let handles: Vec<_> = (0..24)
        .map(|i| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                let path = format!("file-{}.go", i % 6);
                cache.path(RepoId(1), "main", &path, false).await
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.await.unwrap().unwrap().is_some());
    }

    assert_eq!(fixture.repos.get_by_id_calls(), 1);
    assert_eq!(fixture.git.resolve_calls(), 1);
}

#[tokio::test]
async fn test_slow_repository_store_times_out_without_caching() {
    let fixture = Fixture::with_backends(
        MemoryRepositoryStore::new().with_latency(Duration::from_millis(200)),
        MemoryGitService::new(),
    );
    let config = ResolverConfig::default().with_backend_timeout(Duration::from_millis(20));
    let cache = fixture.cache_with(&config);

    let err = cache.repository(RepoId(1)).await.unwrap_err();
    assert!(matches!(err, DomainError::Timeout { .. }));

    let err = cache.commit(RepoId(1), "main").await.unwrap_err();
    assert!(matches!(err, DomainError::Timeout { .. }));
    assert_eq!(fixture.repos.get_by_id_calls(), 2);
    assert_eq!(fixture.git.resolve_calls(), 0);
}
