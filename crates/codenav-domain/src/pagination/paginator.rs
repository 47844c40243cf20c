//! Bounded two-way merge of the upload and index feeds.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use codenav_storage::{Index, ListOptions, PagedRecords, Record, RecordStore, RepoId, Upload};
use tracing::{debug, instrument, warn};

use super::cursor::{DualCursor, OffsetCursor};
use super::states::{Source, StateSplit};
use crate::backend::bounded;
use crate::config::ResolverConfig;
use crate::error::{DomainError, DomainResult};

/// Filter for the precise index feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreciseIndexFilter {
    /// Logical state names; see [`super::backing_state`].
    pub states: Option<Vec<String>>,
    pub repository_id: Option<RepoId>,
    pub term: Option<String>,
    /// Only uploads carry this notion, so setting it to `true` skips indexes.
    pub is_latest_for_repo: Option<bool>,
}

/// One row of the merged feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreciseIndexRow {
    Upload(Upload),
    Index(Index),
}

impl PreciseIndexRow {
    pub fn source(&self) -> Source {
        match self {
            PreciseIndexRow::Upload(_) => Source::Upload,
            PreciseIndexRow::Index(_) => Source::Index,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            PreciseIndexRow::Upload(upload) => upload.id,
            PreciseIndexRow::Index(index) => index.id,
        }
    }

    /// Upload time for uploads, queue time for indexes.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            PreciseIndexRow::Upload(upload) => upload.sort_timestamp(),
            PreciseIndexRow::Index(index) => index.sort_timestamp(),
        }
    }
}

/// A page of the merged feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreciseIndexPage {
    /// Rows ordered newest first.
    pub items: Vec<PreciseIndexRow>,
    /// Cursor for the next page; empty when there is none.
    pub next_cursor: String,
    /// Matching rows across the sources queried for this page.
    pub total_count: usize,
}

/// Presents uploads and indexes as one paginated feed.
///
/// Each page looks at no more than `page_size` rows from each source. When the
/// two sources interleave unevenly, a row can surface one page later than a
/// strict total order across pages would place it.
pub struct DualSourcePaginator {
    uploads: Arc<dyn RecordStore<Upload>>,
    indexes: Arc<dyn RecordStore<Index>>,
    timeout: Duration,
    max_page_size: usize,
}

impl std::fmt::Debug for DualSourcePaginator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DualSourcePaginator")
            .field("timeout", &self.timeout)
            .field("max_page_size", &self.max_page_size)
            .finish_non_exhaustive()
    }
}

impl DualSourcePaginator {
    pub fn new(
        uploads: Arc<dyn RecordStore<Upload>>,
        indexes: Arc<dyn RecordStore<Index>>,
        config: &ResolverConfig,
    ) -> Self {
        Self {
            uploads,
            indexes,
            timeout: config.backend_timeout,
            max_page_size: config.max_page_size,
        }
    }

    /// Fetches one page of the merged feed.
    ///
    /// `cursor` is `None` for the first page. Malformed cursors, unknown state
    /// names and out-of-range page sizes are rejected before any backing call.
    #[instrument(skip(self, filter))]
    pub async fn page(
        &self,
        filter: &PreciseIndexFilter,
        cursor: Option<&str>,
        page_size: usize,
    ) -> DomainResult<PreciseIndexPage> {
        if page_size == 0 || page_size > self.max_page_size {
            return Err(DomainError::InvalidPageSize {
                page_size,
                max: self.max_page_size,
            });
        }
        let cursor = match cursor {
            Some(encoded) => DualCursor::decode(encoded)?,
            None => DualCursor::start(),
        };
        let split = StateSplit::from_logical(filter.states.as_deref().unwrap_or(&[]))?;

        let skip_uploads = split.skip_uploads();
        let skip_indexes = split.skip_indexes() || filter.is_latest_for_repo == Some(true);
        if skip_uploads {
            metrics::counter!("codenav_paginator_source_skipped_total", "source" => "upload")
                .increment(1);
        }
        if skip_indexes {
            metrics::counter!("codenav_paginator_source_skipped_total", "source" => "index")
                .increment(1);
        }

        let upload_offset = cursor.upload_offset.filter(|_| !skip_uploads);
        let index_offset = cursor.index_offset.filter(|_| !skip_indexes);
        let options = |offset: usize, states: Vec<String>| ListOptions {
            repository_id: filter.repository_id,
            states,
            term: filter.term.clone(),
            is_latest_for_repo: filter.is_latest_for_repo,
            offset,
            limit: page_size,
        };

        let (uploads, indexes) = tokio::try_join!(
            self.fetch(&self.uploads, upload_offset.map(|o| options(o, split.upload.clone()))),
            self.fetch(&self.indexes, index_offset.map(|o| options(o, split.index.clone()))),
        )?;

        let upload_total = uploads.total_count;
        let index_total = indexes.total_count;
        let (items, consumed_uploads, consumed_indexes) =
            merge(uploads.records, indexes.records, page_size);

        let next = DualCursor {
            upload_offset: advance(upload_offset, consumed_uploads, upload_total),
            index_offset: advance(index_offset, consumed_indexes, index_total),
        };
        debug!(
            items = items.len(),
            consumed_uploads,
            consumed_indexes,
            next_cursor = %next.encode(),
            "merged page"
        );

        Ok(PreciseIndexPage {
            items,
            next_cursor: next.encode(),
            total_count: upload_total + index_total,
        })
    }

    /// Runs one source's list query; `None` options mean the source is not read.
    async fn fetch<R: Record>(
        &self,
        store: &Arc<dyn RecordStore<R>>,
        options: Option<ListOptions>,
    ) -> DomainResult<PagedRecords<R>> {
        let Some(options) = options else {
            return Ok(PagedRecords {
                records: Vec::new(),
                total_count: 0,
            });
        };
        match bounded(self.timeout, store.get_paged_list(&options)).await? {
            Ok(page) => Ok(page),
            Err(err) => {
                warn!(error = %err, offset = options.offset, "paged list query failed");
                Err(err.into())
            }
        }
    }
}

/// Interleaves two newest-first windows, preferring the index on equal
/// timestamps, until `limit` rows are taken or both windows are empty.
///
/// Returns the merged rows and how many were taken from each window.
fn merge(
    uploads: Vec<Upload>,
    indexes: Vec<Index>,
    limit: usize,
) -> (Vec<PreciseIndexRow>, usize, usize) {
    let mut uploads = uploads.into_iter().peekable();
    let mut indexes = indexes.into_iter().peekable();
    let mut items = Vec::with_capacity(limit);
    let (mut consumed_uploads, mut consumed_indexes) = (0, 0);

    while items.len() < limit {
        let take_upload = match (uploads.peek(), indexes.peek()) {
            (Some(upload), Some(index)) => upload.uploaded_at > index.queued_at,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => break,
        };

        if take_upload {
            if let Some(upload) = uploads.next() {
                items.push(PreciseIndexRow::Upload(upload));
                consumed_uploads += 1;
            }
        } else if let Some(index) = indexes.next() {
            items.push(PreciseIndexRow::Index(index));
            consumed_indexes += 1;
        }
    }

    (items, consumed_uploads, consumed_indexes)
}

/// New offset for a source, or `None` once it has nothing left.
fn advance(offset: Option<usize>, consumed: usize, total: usize) -> Option<usize> {
    OffsetCursor::after(offset?, consumed, total).offset
}
