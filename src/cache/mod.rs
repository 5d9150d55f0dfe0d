//! Versioned local cache of HTTP responses
//!
//! One generation of cached content is live at a time. A generation is a
//! pair of namespaces derived from the product and version tags: one for
//! static assets, one for API responses.

pub mod key;
pub mod storage;

pub use key::RequestKey;
pub use storage::{CacheEntry, CacheStats, CacheStorage};

/// The namespace pair for one product generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespaces {
    product: String,
    version: String,
}

impl Namespaces {
    pub fn new(product: &str, version: &str) -> Self {
        Self {
            product: product.to_string(),
            version: version.to_string(),
        }
    }

    /// Namespace holding precached static assets, e.g. `cartrace-v1.0.0`
    pub fn statics(&self) -> String {
        format!("{}-{}", self.product, self.version)
    }

    /// Namespace holding cached API responses, e.g. `cartrace-api-v1.0.0`
    pub fn api(&self) -> String {
        format!("{}-api-{}", self.product, self.version)
    }

    /// Whether a namespace belongs to this product (any generation)
    pub fn owns(&self, namespace: &str) -> bool {
        namespace.starts_with(&format!("{}-", self.product))
    }

    /// Whether a namespace is part of the current generation
    pub fn is_current(&self, namespace: &str) -> bool {
        namespace == self.statics() || namespace == self.api()
    }

    /// Whether a namespace is owned by this product but not current.
    /// Stale namespaces are eligible for eviction on activate.
    pub fn is_stale(&self, namespace: &str) -> bool {
        self.owns(namespace) && !self.is_current(namespace)
    }
}
