//! codenav-domain: Request-scoped resolution logic
//!
//! This crate contains the per-request caching and batching layer that sits
//! between field resolvers and the backing services:
//! - Keyed batch loader and the prefetcher built from it
//! - Hierarchical repository → commit → path location cache
//! - Dual-source pagination over uploads and indexes
//!
//! Every type here is meant to be constructed once per logical request and
//! dropped afterward. Nothing is invalidated, so nothing may outlive the
//! request that created it.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               codenav-domain                 │
//! ├─────────────────────────────────────────────┤
//! │  loader/     - Batch loader & prefetcher    │
//! │  location/   - Repo/commit/path cache       │
//! │  pagination/ - Cursor, states, merge        │
//! │  config.rs   - Resolver configuration       │
//! └─────────────────────────────────────────────┘
//! ```

mod backend;
pub mod config;
pub mod error;
pub mod loader;
pub mod location;
pub mod pagination;

// Re-export commonly used types at the crate root
pub use config::ResolverConfig;
pub use error::{DomainError, DomainResult};
pub use loader::{BatchFetcher, Keyed, KeyedBatchLoader, Prefetcher, RecordFetcher};
pub use location::{CommitHandle, LocationCache, PathEntry, RepositoryHandle};
pub use pagination::{
    DualCursor, DualSourcePaginator, OffsetCursor, PreciseIndexFilter, PreciseIndexPage,
    PreciseIndexRow, Source, StateSplit,
};
