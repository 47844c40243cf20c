//! Generic keyed batch loader.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use codenav_storage::{Index, Record, RecordStore, StorageResult, Upload};
use dashmap::DashSet;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::backend::bounded;
use crate::error::DomainResult;

/// A value that knows its own key.
pub trait Keyed<K> {
    fn key(&self) -> K;
}

impl Keyed<i64> for Upload {
    fn key(&self) -> i64 {
        self.id
    }
}

impl Keyed<i64> for Index {
    fn key(&self) -> i64 {
        self.id
    }
}

/// Backing batch operation for a [`KeyedBatchLoader`].
#[async_trait]
pub trait BatchFetcher<K, V>: Send + Sync {
    /// Fetches every value whose key is in `keys`. Missing keys are omitted.
    async fn fetch_many(&self, keys: &[K]) -> StorageResult<Vec<V>>;
}

/// Adapts a [`RecordStore`] to the [`BatchFetcher`] interface.
pub struct RecordFetcher<R: Record> {
    store: Arc<dyn RecordStore<R>>,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> RecordFetcher<R> {
    pub fn new(store: Arc<dyn RecordStore<R>>) -> Self {
        Self {
            store,
            _record: PhantomData,
        }
    }
}

#[async_trait]
impl<R: Record> BatchFetcher<i64, R> for RecordFetcher<R> {
    async fn fetch_many(&self, keys: &[i64]) -> StorageResult<Vec<R>> {
        self.store.get_by_ids(keys).await
    }
}

/// Fetch-once cache over a batch backing operation.
///
/// Entries are `None` once a key has been fetched and the backend did not
/// return it, so absent keys are not re-requested either.
pub struct KeyedBatchLoader<K, V> {
    /// Loader name used in logs and metric labels.
    name: &'static str,
    fetcher: Arc<dyn BatchFetcher<K, V>>,
    cache: RwLock<HashMap<K, Option<Arc<V>>>>,
    /// Keys registered by `presubmit` and not yet fetched.
    pending: DashSet<K>,
    timeout: Duration,
}

impl<K: Eq + Hash, V> std::fmt::Debug for KeyedBatchLoader<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyedBatchLoader")
            .field("name", &self.name)
            .field("pending", &self.pending.len())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl<K, V> KeyedBatchLoader<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Keyed<K> + Send + Sync + 'static,
{
    /// Creates an empty loader.
    pub fn new(name: &'static str, fetcher: Arc<dyn BatchFetcher<K, V>>, timeout: Duration) -> Self {
        Self {
            name,
            fetcher,
            cache: RwLock::new(HashMap::new()),
            pending: DashSet::new(),
            timeout,
        }
    }

    /// Registers keys for the next batch fetch without fetching anything.
    pub fn presubmit<I>(&self, ids: I)
    where
        I: IntoIterator<Item = K>,
    {
        for id in ids {
            self.pending.insert(id);
        }
    }

    /// Number of keys waiting for the next drain.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Returns the value for `id`, fetching it together with every pending key
    /// on a cache miss.
    ///
    /// `Ok(None)` means the backend does not know `id`. On error nothing is
    /// cached and the drained keys stay pending for the next attempt.
    pub async fn get_by_id(&self, id: &K) -> DomainResult<Option<Arc<V>>> {
        if let Some(entry) = self.cache.read().await.get(id) {
            metrics::counter!("codenav_loader_hits_total", "loader" => self.name).increment(1);
            return Ok(entry.clone());
        }

        let mut cache = self.cache.write().await;
        // Another caller may have fetched this key while we waited for the lock.
        if let Some(entry) = cache.get(id) {
            metrics::counter!("codenav_loader_hits_total", "loader" => self.name).increment(1);
            return Ok(entry.clone());
        }
        metrics::counter!("codenav_loader_misses_total", "loader" => self.name).increment(1);

        self.pending.insert(id.clone());
        let drained: Vec<K> = self.pending.iter().map(|k| k.key().clone()).collect();
        let keys: Vec<K> = drained
            .iter()
            .filter(|k| !cache.contains_key(*k))
            .cloned()
            .collect();

        debug!(loader = self.name, batch_size = keys.len(), "fetching batch");
        metrics::counter!("codenav_loader_batches_total", "loader" => self.name).increment(1);

        let values = match bounded(self.timeout, self.fetcher.fetch_many(&keys)).await {
            Ok(Ok(values)) => values,
            Ok(Err(err)) => {
                warn!(loader = self.name, batch_size = keys.len(), error = %err, "batch fetch failed");
                return Err(err.into());
            }
            Err(err) => {
                warn!(loader = self.name, batch_size = keys.len(), error = %err, "batch fetch timed out");
                return Err(err);
            }
        };

        for key in &drained {
            self.pending.remove(key);
        }
        for value in values {
            cache.insert(value.key(), Some(Arc::new(value)));
        }
        for key in keys {
            cache.entry(key).or_insert(None);
        }

        Ok(cache.get(id).cloned().flatten())
    }
}
