//! Keyed batch loading for resolver trees.
//!
//! A resolver that is about to construct N children registers the record IDs
//! those children will need with [`Prefetcher::mark_upload`] and
//! [`Prefetcher::mark_index`]. The first child that actually asks for a record
//! drains every registered ID into a single backing call, and all siblings are
//! then served from the loader's cache:
//!
//! 1. **Presubmit**: IDs accumulate in the pending set; no I/O happens
//! 2. **Drain**: the first cache miss fetches the whole pending set at once
//! 3. **Memoize**: every requested ID is cached, found or not, for the request
//!
//! Cache-miss fetches on one loader are serialized behind its write lock, so
//! the batch a caller drains always contains every key registered before it.

mod batch;
mod prefetcher;

pub use batch::{BatchFetcher, Keyed, KeyedBatchLoader, RecordFetcher};
pub use prefetcher::Prefetcher;
