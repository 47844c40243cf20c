//! Tests for the dual-source paginator.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use codenav_storage::{
    Index, MemoryIndexStore, MemoryUploadStore, RepoId, StorageError, Upload,
};

use super::*;
use crate::config::ResolverConfig;
use crate::error::DomainError;

fn upload(id: i64, secs: i64, state: &str) -> Upload {
    Upload {
        id,
        repository_id: RepoId(1),
        commit: format!("{:040x}", id),
        root: String::new(),
        indexer: "scip-go".to_string(),
        state: state.to_string(),
        uploaded_at: Utc.timestamp_opt(secs, 0).unwrap(),
        visible_at_tip: true,
        associated_index_id: None,
    }
}

fn index(id: i64, secs: i64, state: &str) -> Index {
    Index {
        id,
        repository_id: RepoId(1),
        commit: format!("{:040x}", id),
        root: String::new(),
        indexer: "scip-typescript".to_string(),
        state: state.to_string(),
        queued_at: Utc.timestamp_opt(secs, 0).unwrap(),
        associated_upload_id: None,
    }
}

struct Fixture {
    uploads: Arc<MemoryUploadStore>,
    indexes: Arc<MemoryIndexStore>,
}

impl Fixture {
    fn new() -> Self {
        Self {
            uploads: MemoryUploadStore::new_shared(),
            indexes: MemoryIndexStore::new_shared(),
        }
    }

    /// Uploads at 10, 8, 5 and indexes at 9, 7.
    fn interleaved() -> Self {
        let fixture = Self::new();
        for (id, secs) in [(1, 10), (2, 8), (3, 5)] {
            fixture.uploads.insert(upload(id, secs, "completed"));
        }
        for (id, secs) in [(11, 9), (12, 7)] {
            fixture.indexes.insert(index(id, secs, "queued"));
        }
        fixture
    }

    fn paginator(&self) -> DualSourcePaginator {
        self.paginator_with(&ResolverConfig::default())
    }

    fn paginator_with(&self, config: &ResolverConfig) -> DualSourcePaginator {
        DualSourcePaginator::new(self.uploads.clone(), self.indexes.clone(), config)
    }

    fn list_calls(&self) -> (usize, usize) {
        (self.uploads.list_calls(), self.indexes.list_calls())
    }
}

fn timestamps(page: &PreciseIndexPage) -> Vec<i64> {
    page.items.iter().map(|row| row.timestamp().timestamp()).collect()
}

fn states(names: &[&str]) -> PreciseIndexFilter {
    PreciseIndexFilter {
        states: Some(names.iter().map(|s| s.to_string()).collect()),
        ..Default::default()
    }
}

// ========== Section 1: Merge ==========

#[tokio::test]
async fn test_first_page_merges_by_timestamp() {
    let fixture = Fixture::interleaved();
    let paginator = fixture.paginator();

    let page = paginator
        .page(&PreciseIndexFilter::default(), None, 4)
        .await
        .unwrap();

    assert_eq!(timestamps(&page), vec![10, 9, 8, 7]);
    assert_eq!(
        page.items.iter().map(PreciseIndexRow::source).collect::<Vec<_>>(),
        vec![Source::Upload, Source::Index, Source::Upload, Source::Index]
    );
    // Two of three uploads consumed; both indexes consumed.
    assert_eq!(page.next_cursor, "2:");
    assert_eq!(page.total_count, 5);
}

#[tokio::test]
async fn test_cursor_keeps_both_offsets_when_both_sources_remain() {
    let fixture = Fixture::interleaved();
    fixture.indexes.insert(index(13, 1, "queued"));

    let page = fixture
        .paginator()
        .page(&PreciseIndexFilter::default(), None, 4)
        .await
        .unwrap();

    assert_eq!(timestamps(&page), vec![10, 9, 8, 7]);
    assert_eq!(page.next_cursor, "2:2");
    assert_eq!(page.total_count, 6);
}

#[tokio::test]
async fn test_second_page_reads_only_remaining_source() {
    let fixture = Fixture::interleaved();
    let paginator = fixture.paginator();

    let page = paginator
        .page(&PreciseIndexFilter::default(), Some("2:"), 4)
        .await
        .unwrap();

    assert_eq!(timestamps(&page), vec![5]);
    assert_eq!(page.next_cursor, "");
    assert_eq!(page.total_count, 3, "only the upload source was queried");
    assert_eq!(fixture.list_calls(), (1, 0));
}

#[tokio::test]
async fn test_index_wins_timestamp_tie() {
    let fixture = Fixture::new();
    fixture.uploads.insert(upload(1, 5, "completed"));
    fixture.indexes.insert(index(2, 5, "queued"));

    let page = fixture
        .paginator()
        .page(&PreciseIndexFilter::default(), None, 1)
        .await
        .unwrap();

    assert_eq!(page.items, vec![PreciseIndexRow::Index(index(2, 5, "queued"))]);
    assert_eq!(page.next_cursor, "0:");
}

#[tokio::test]
async fn test_walking_all_pages_yields_every_row_once() {
    let fixture = Fixture::new();
    for id in 1..=7 {
        fixture.uploads.insert(upload(id, id * 3, "completed"));
    }
    for id in 1..=5 {
        fixture.indexes.insert(index(100 + id, id * 4, "queued"));
    }
    let paginator = fixture.paginator();

    let mut seen = HashSet::new();
    let mut cursor: Option<String> = None;
    let mut pages = 0;
    loop {
        let page = paginator
            .page(&PreciseIndexFilter::default(), cursor.as_deref(), 3)
            .await
            .unwrap();
        let ts = timestamps(&page);
        assert!(ts.windows(2).all(|w| w[0] >= w[1]), "page is newest first");
        for row in &page.items {
            assert!(seen.insert((row.source(), row.id())), "row returned twice");
        }
        pages += 1;
        if page.next_cursor.is_empty() {
            break;
        }
        cursor = Some(page.next_cursor);
        assert!(pages < 10, "pagination did not terminate");
    }

    assert_eq!(seen.len(), 12);
}

// ========== Section 2: State filters ==========

#[tokio::test]
async fn test_state_filter_is_split_per_source() {
    let fixture = Fixture::interleaved();

    fixture
        .paginator()
        .page(&states(&["COMPLETED", "INDEXING_ERRORED"]), None, 10)
        .await
        .unwrap();

    let upload_requests = fixture.uploads.list_requests().await;
    let index_requests = fixture.indexes.list_requests().await;
    assert_eq!(upload_requests[0].states, vec!["completed"]);
    assert_eq!(index_requests[0].states, vec!["errored"]);
}

#[test]
fn test_same_backing_state_on_both_sides_skips_neither() {
    let split =
        StateSplit::from_logical(&["QUEUED_FOR_PROCESSING", "QUEUED_FOR_INDEXING"]).unwrap();

    assert_eq!(split.upload, vec!["queued"]);
    assert_eq!(split.index, vec!["queued"]);
    assert!(!split.skip_uploads());
    assert!(!split.skip_indexes());
}

#[tokio::test]
async fn test_index_only_states_skip_upload_source() {
    let fixture = Fixture::new();
    fixture.uploads.insert(upload(1, 10, "errored"));
    fixture.indexes.insert(index(2, 5, "errored"));
    fixture.indexes.insert(index(3, 4, "queued"));

    let page = fixture
        .paginator()
        .page(&states(&["INDEXING_ERRORED"]), None, 10)
        .await
        .unwrap();

    assert_eq!(page.items, vec![PreciseIndexRow::Index(index(2, 5, "errored"))]);
    assert_eq!(page.total_count, 1);
    assert_eq!(page.next_cursor, "");
    assert_eq!(fixture.list_calls(), (0, 1));
}

#[tokio::test]
async fn test_upload_only_states_skip_index_source() {
    let fixture = Fixture::interleaved();

    let page = fixture
        .paginator()
        .page(&states(&["completed"]), None, 10)
        .await
        .unwrap();

    assert_eq!(timestamps(&page), vec![10, 8, 5]);
    assert_eq!(fixture.list_calls(), (1, 0));
}

#[tokio::test]
async fn test_latest_for_repo_skips_index_source() {
    let fixture = Fixture::interleaved();
    let filter = PreciseIndexFilter {
        is_latest_for_repo: Some(true),
        ..Default::default()
    };

    let page = fixture.paginator().page(&filter, None, 10).await.unwrap();

    assert_eq!(page.items.len(), 3);
    assert_eq!(fixture.list_calls(), (1, 0));
}

#[tokio::test]
async fn test_latest_for_repo_false_still_reads_indexes() {
    let fixture = Fixture::interleaved();
    let filter = PreciseIndexFilter {
        is_latest_for_repo: Some(false),
        ..Default::default()
    };

    let page = fixture.paginator().page(&filter, None, 10).await.unwrap();

    // Every fixture upload is visible at tip, so only the indexes match.
    assert_eq!(timestamps(&page), vec![9, 7]);
    assert_eq!(fixture.list_calls(), (1, 1));
}

#[tokio::test]
async fn test_filter_fields_are_forwarded() {
    let fixture = Fixture::interleaved();
    let filter = PreciseIndexFilter {
        repository_id: Some(RepoId(1)),
        term: Some("scip".to_string()),
        ..Default::default()
    };

    fixture
        .paginator()
        .page(&filter, Some("1:0"), 2)
        .await
        .unwrap();

    let request = &fixture.uploads.list_requests().await[0];
    assert_eq!(request.repository_id, Some(RepoId(1)));
    assert_eq!(request.term.as_deref(), Some("scip"));
    assert_eq!(request.offset, 1);
    assert_eq!(request.limit, 2);
    assert!(request.states.is_empty());
}

// ========== Section 3: Rejected input ==========

#[tokio::test]
async fn test_unknown_state_is_rejected_without_backing_calls() {
    let fixture = Fixture::interleaved();

    let err = fixture
        .paginator()
        .page(&states(&["COMPLETED", "FROBNICATED"]), None, 10)
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::UnknownState { ref state } if state == "FROBNICATED"));
    assert_eq!(fixture.list_calls(), (0, 0));
}

#[tokio::test]
async fn test_malformed_cursor_is_rejected_without_backing_calls() {
    let fixture = Fixture::interleaved();
    let paginator = fixture.paginator();

    for cursor in ["abc", "1:2:3", "-1:0", "x:"] {
        let err = paginator
            .page(&PreciseIndexFilter::default(), Some(cursor), 10)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidCursor { .. }), "{cursor}");
    }
    assert_eq!(fixture.list_calls(), (0, 0));
}

#[tokio::test]
async fn test_exhausted_cursor_returns_empty_page() {
    let fixture = Fixture::interleaved();

    let page = fixture
        .paginator()
        .page(&PreciseIndexFilter::default(), Some(""), 10)
        .await
        .unwrap();

    assert!(page.items.is_empty());
    assert_eq!(page.next_cursor, "");
    assert_eq!(page.total_count, 0);
    assert_eq!(fixture.list_calls(), (0, 0));
}

#[tokio::test]
async fn test_page_size_out_of_range_is_rejected() {
    let fixture = Fixture::interleaved();
    let config = ResolverConfig::default().with_max_page_size(5);
    let paginator = fixture.paginator_with(&config);

    for page_size in [0, 6] {
        let err = paginator
            .page(&PreciseIndexFilter::default(), None, page_size)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidPageSize { max: 5, .. }));
    }
    assert_eq!(fixture.list_calls(), (0, 0));
}

// ========== Section 4: Backend failures ==========

#[tokio::test]
async fn test_source_error_fails_the_page() {
    let fixture = Fixture::interleaved();
    fixture.indexes.fail_next(1);

    let err = fixture
        .paginator()
        .page(&PreciseIndexFilter::default(), None, 4)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DomainError::Storage(StorageError::ConnectionError { .. })
    ));
}

#[tokio::test]
async fn test_slow_source_times_out() {
    let fixture = Fixture {
        uploads: Arc::new(MemoryUploadStore::new().with_latency(Duration::from_millis(200))),
        indexes: MemoryIndexStore::new_shared(),
    };
    let config = ResolverConfig::default().with_backend_timeout(Duration::from_millis(20));

    let err = fixture
        .paginator_with(&config)
        .page(&PreciseIndexFilter::default(), None, 4)
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::Timeout { duration_ms: 20 }));
}
