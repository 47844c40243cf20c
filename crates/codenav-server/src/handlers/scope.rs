//! Backend bundle and per-request scope.

use std::sync::Arc;

use codenav_domain::{
    DomainResult, DualSourcePaginator, LocationCache, PreciseIndexFilter, PreciseIndexRow,
    Prefetcher, ResolverConfig,
};
use codenav_storage::{GitService, Index, RecordStore, RepositoryStore, Upload};
use tracing::{debug, instrument};

use super::precise_index::{PageInfo, PreciseIndexConnection, PreciseIndexResolver};

/// Long-lived handles to the backing services.
#[derive(Clone)]
pub struct Backends {
    pub repositories: Arc<dyn RepositoryStore>,
    pub git: Arc<dyn GitService>,
    pub uploads: Arc<dyn RecordStore<Upload>>,
    pub indexes: Arc<dyn RecordStore<Index>>,
    pub config: ResolverConfig,
}

impl Backends {
    pub fn new(
        repositories: Arc<dyn RepositoryStore>,
        git: Arc<dyn GitService>,
        uploads: Arc<dyn RecordStore<Upload>>,
        indexes: Arc<dyn RecordStore<Index>>,
        config: ResolverConfig,
    ) -> Self {
        Self {
            repositories,
            git,
            uploads,
            indexes,
            config,
        }
    }

    /// Creates the caches for one request. Drop the scope when the request ends.
    pub fn request_scope(&self) -> RequestScope {
        RequestScope {
            locations: Arc::new(LocationCache::new(
                Arc::clone(&self.repositories),
                Arc::clone(&self.git),
                &self.config,
            )),
            prefetcher: Arc::new(Prefetcher::new(
                Arc::clone(&self.uploads),
                Arc::clone(&self.indexes),
                &self.config,
            )),
            paginator: DualSourcePaginator::new(
                Arc::clone(&self.uploads),
                Arc::clone(&self.indexes),
                &self.config,
            ),
            config: self.config.clone(),
        }
    }
}

/// Caches shared by every resolver created while serving one request.
#[derive(Debug)]
pub struct RequestScope {
    locations: Arc<LocationCache>,
    prefetcher: Arc<Prefetcher>,
    paginator: DualSourcePaginator,
    config: ResolverConfig,
}

impl RequestScope {
    pub fn locations(&self) -> &Arc<LocationCache> {
        &self.locations
    }

    pub fn prefetcher(&self) -> &Arc<Prefetcher> {
        &self.prefetcher
    }

    /// Wraps an upload row in a resolver bound to this scope.
    pub fn upload_resolver(&self, upload: Upload) -> PreciseIndexResolver {
        self.resolver(PreciseIndexRow::Upload(upload))
    }

    /// Wraps an index row in a resolver bound to this scope.
    pub fn index_resolver(&self, index: Index) -> PreciseIndexResolver {
        self.resolver(PreciseIndexRow::Index(index))
    }

    fn resolver(&self, row: PreciseIndexRow) -> PreciseIndexResolver {
        PreciseIndexResolver::new(
            row,
            Arc::clone(&self.locations),
            Arc::clone(&self.prefetcher),
        )
    }

    /// Looks up a single precise index by the ID its resolver reports.
    ///
    /// IDs that are not of the form `upload:<n>` or `index:<n>` resolve to `None`.
    pub async fn precise_index(&self, id: &str) -> DomainResult<Option<PreciseIndexResolver>> {
        let Some((kind, raw)) = id.split_once(':') else {
            return Ok(None);
        };
        let Ok(row_id) = raw.parse::<i64>() else {
            return Ok(None);
        };

        match kind {
            "upload" => Ok(self
                .prefetcher
                .get_upload_by_id(row_id)
                .await?
                .map(|upload| self.upload_resolver(upload.as_ref().clone()))),
            "index" => Ok(self
                .prefetcher
                .get_index_by_id(row_id)
                .await?
                .map(|index| self.index_resolver(index.as_ref().clone()))),
            _ => Ok(None),
        }
    }

    /// Resolves one page of the precise index connection.
    ///
    /// `first` falls back to the configured default page size and is capped at
    /// the configured maximum.
    #[instrument(skip(self, filter))]
    pub async fn precise_indexes(
        &self,
        filter: &PreciseIndexFilter,
        after: Option<&str>,
        first: Option<usize>,
    ) -> DomainResult<PreciseIndexConnection> {
        let page_size = self.config.page_size(first);
        let page = self.paginator.page(filter, after, page_size).await?;

        // Every node marks its counterpart before any node is resolved, so
        // the first counterpart lookup fetches them all in one batch.
        let nodes: Vec<_> = page.items.into_iter().map(|row| self.resolver(row)).collect();
        debug!(nodes = nodes.len(), total = page.total_count, "resolved connection page");

        let has_next_page = !page.next_cursor.is_empty();
        Ok(PreciseIndexConnection {
            nodes,
            total_count: page.total_count,
            page_info: PageInfo {
                end_cursor: has_next_page.then_some(page.next_cursor),
                has_next_page,
            },
        })
    }
}
