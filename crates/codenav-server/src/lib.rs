//! codenav-server: Request scope wiring, configuration and logging
//!
//! This crate assembles the resolution layer for a serving process:
//! - Configuration loading (YAML file plus `CODENAV_` environment overrides)
//! - Logging setup
//! - Backends and the per-request scope
//! - Precise index resolvers and the connection that pages them
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               codenav-server                 │
//! ├─────────────────────────────────────────────┤
//! │  config.rs      - Configuration management  │
//! │  observability/ - Logging setup             │
//! │  handlers/      - Request scope             │
//! │    scope.rs         - Backends, scope       │
//! │    precise_index.rs - Index resolvers       │
//! └─────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod handlers;
pub mod observability;

// Re-exports for convenience
pub use config::{ConfigLoadError, ServerConfig};
pub use handlers::{Backends, PageInfo, PreciseIndexConnection, PreciseIndexResolver, RequestScope};
