//! Upload and index prefetcher shared by a resolver tree.

use std::sync::Arc;

use codenav_storage::{Index, RecordStore, Upload};

use super::batch::{KeyedBatchLoader, RecordFetcher};
use crate::config::ResolverConfig;
use crate::error::DomainResult;

/// Per-operation facade over one batch loader per record kind.
///
/// Parent resolvers mark the IDs their children will need; the first child to
/// call a `get_*` method fetches every marked ID of that kind in one call.
#[derive(Debug)]
pub struct Prefetcher {
    uploads: KeyedBatchLoader<i64, Upload>,
    indexes: KeyedBatchLoader<i64, Index>,
}

impl Prefetcher {
    /// Creates a prefetcher over the given record stores.
    pub fn new(
        upload_store: Arc<dyn RecordStore<Upload>>,
        index_store: Arc<dyn RecordStore<Index>>,
        config: &ResolverConfig,
    ) -> Self {
        Self {
            uploads: KeyedBatchLoader::new(
                "upload",
                Arc::new(RecordFetcher::new(upload_store)),
                config.backend_timeout,
            ),
            indexes: KeyedBatchLoader::new(
                "index",
                Arc::new(RecordFetcher::new(index_store)),
                config.backend_timeout,
            ),
        }
    }

    pub fn mark_upload(&self, id: i64) {
        self.uploads.presubmit([id]);
    }

    pub fn mark_index(&self, id: i64) {
        self.indexes.presubmit([id]);
    }

    pub async fn get_upload_by_id(&self, id: i64) -> DomainResult<Option<Arc<Upload>>> {
        self.uploads.get_by_id(&id).await
    }

    pub async fn get_index_by_id(&self, id: i64) -> DomainResult<Option<Arc<Index>>> {
        self.indexes.get_by_id(&id).await
    }
}
