//! Observability setup for processes embedding the resolution layer.
//!
//! Resolvers emit `tracing` spans and events and `metrics` counters. This
//! module installs the subscriber that turns those events into log lines.

mod logging;

pub use logging::{init_logging, json_subscriber, LoggingConfig};
