//! Configuration for request-scoped resolvers.

use std::time::Duration;

/// Configuration shared by the caches, loaders and paginator of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Upper bound on any single backing call.
    pub backend_timeout: Duration,
    /// Page size used when a connection field does not specify one.
    pub default_page_size: usize,
    /// Largest page size a connection field may request.
    pub max_page_size: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            backend_timeout: Duration::from_secs(30),
            default_page_size: 50,
            max_page_size: 1000,
        }
    }
}

impl ResolverConfig {
    /// Sets the backing call timeout.
    pub fn with_backend_timeout(mut self, timeout: Duration) -> Self {
        self.backend_timeout = timeout;
        self
    }

    /// Sets the default page size.
    pub fn with_default_page_size(mut self, page_size: usize) -> Self {
        self.default_page_size = page_size;
        self
    }

    /// Sets the maximum page size.
    pub fn with_max_page_size(mut self, page_size: usize) -> Self {
        self.max_page_size = page_size;
        self
    }

    /// Resolves a requested page size against the configured default and bound.
    pub fn page_size(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_page_size)
            .min(self.max_page_size)
    }
}
