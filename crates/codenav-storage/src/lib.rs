//! codenav-storage: Backing service contracts
//!
//! This crate describes the external collaborators the resolution layer
//! talks to, including:
//! - Repository store (fetch repository by ID)
//! - Revision-control service (resolve revisions, read file content)
//! - Record stores for uploads and indexes (batch-by-ID and paged listing)
//! - In-memory implementations for testing and local wiring
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              codenav-storage                 │
//! ├─────────────────────────────────────────────┤
//! │  models.rs - Repository, Upload, Index      │
//! │  traits.rs - Collaborator trait definitions │
//! │  memory.rs - In-memory implementations      │
//! └─────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod memory;
pub mod models;
pub mod traits;

// Re-export commonly used types
pub use error::{StorageError, StorageResult};
pub use memory::{
    MemoryGitService, MemoryIndexStore, MemoryRecordStore, MemoryRepositoryStore,
    MemoryUploadStore,
};
pub use models::{CommitId, Index, RepoId, Repository, Upload};
pub use traits::{GitService, ListOptions, PagedRecords, Record, RecordStore, RepositoryStore};
