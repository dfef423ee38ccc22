use std::sync::Arc;
use std::time::Duration;

/// A successful response body kept for replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// Response cache trait - TTL-keyed store for idempotent reads.
///
/// Entries have no invalidation API; they are fresh until their TTL elapses
/// and logically absent afterwards.
pub trait ResponseCache: Send + Sync {
    /// Get a fresh entry. Stale entries are reported as a miss.
    fn lookup(&self, signature: &str) -> Option<Arc<CachedResponse>>;

    /// Store a response for `ttl`.
    fn store(
        &self,
        signature: String,
        response: CachedResponse,
        ttl: Duration,
    ) -> Result<(), CacheError>;

    /// Evict stale entries. Returns how many were removed.
    fn sweep(&self) -> usize;

    /// Number of entries held, fresh or not yet evicted.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cache operation errors.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Payload too large: {size} bytes exceeds {max}")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("Cache is full ({0} entries)")]
    Full(usize),

    #[error("Serialization failed: {0}")]
    Serialization(String),
}
