//! In-memory TTL response cache.
//!
//! Entries go ABSENT -> FRESH -> STALE. A stale entry is treated as absent
//! and removed on the next lookup of its key or by the periodic sweep.
//! Note: Data is lost on process restart.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use switchboard_core::ports::{CacheError, CachedResponse, Clock, ResponseCache};

/// Bounds for the in-memory response cache.
#[derive(Debug, Clone)]
pub struct ResponseCacheConfig {
    /// Maximum number of entries held at once.
    pub max_entries: usize,
    /// Largest body accepted for caching.
    pub max_payload_bytes: usize,
}

impl Default for ResponseCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            max_payload_bytes: 256 * 1024,
        }
    }
}

impl ResponseCacheConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_entries: std::env::var("RESPONSE_CACHE_MAX_ENTRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_entries),
            max_payload_bytes: std::env::var("RESPONSE_CACHE_MAX_PAYLOAD_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_payload_bytes),
        }
    }
}

struct CacheEntry {
    response: Arc<CachedResponse>,
    stored_at_ms: i64,
    ttl_ms: i64,
}

impl CacheEntry {
    fn is_fresh(&self, now_ms: i64) -> bool {
        now_ms.saturating_sub(self.stored_at_ms) < self.ttl_ms
    }
}

/// Process-local response cache over a sharded concurrent map.
///
/// `max_entries` is a hard bound: a new key must reserve a slot in
/// `occupied` before it is inserted, and every removal releases one.
pub struct InMemoryResponseCache {
    entries: DashMap<String, CacheEntry>,
    occupied: AtomicUsize,
    clock: Arc<dyn Clock>,
    config: ResponseCacheConfig,
}

impl InMemoryResponseCache {
    pub fn new(clock: Arc<dyn Clock>, config: ResponseCacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            occupied: AtomicUsize::new(0),
            clock,
            config,
        }
    }

    fn reserve_slot(&self) -> bool {
        let max = self.config.max_entries;
        self.occupied
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n < max).then_some(n + 1))
            .is_ok()
    }

    fn release_slots(&self, count: usize) {
        if count > 0 {
            self.occupied.fetch_sub(count, Ordering::AcqRel);
        }
    }
}

impl ResponseCache for InMemoryResponseCache {
    fn lookup(&self, signature: &str) -> Option<Arc<CachedResponse>> {
        let now = self.clock.now_ms();

        let stale = match self.entries.get(signature) {
            Some(entry) if entry.is_fresh(now) => return Some(entry.response.clone()),
            Some(_) => true,
            None => false,
        };

        // The read guard is gone; re-check under the write lock in case a
        // fresh entry replaced it meanwhile.
        if stale && self.entries.remove_if(signature, |_, e| !e.is_fresh(now)).is_some() {
            self.release_slots(1);
        }
        None
    }

    fn store(
        &self,
        signature: String,
        response: CachedResponse,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        if response.body.len() > self.config.max_payload_bytes {
            return Err(CacheError::PayloadTooLarge {
                size: response.body.len(),
                max: self.config.max_payload_bytes,
            });
        }

        let ttl_ms = i64::try_from(ttl.as_millis())
            .map_err(|_| CacheError::Serialization(format!("ttl {ttl:?} out of range")))?;

        let entry = CacheEntry {
            response: Arc::new(response),
            stored_at_ms: self.clock.now_ms(),
            ttl_ms,
        };

        // Overwrites never need a slot.
        if let Some(mut existing) = self.entries.get_mut(&signature) {
            *existing = entry;
            return Ok(());
        }

        // No shard lock is held here, so sweeping cannot deadlock.
        if !self.reserve_slot() {
            self.sweep();
            if !self.reserve_slot() {
                return Err(CacheError::Full(self.config.max_entries));
            }
        }

        match self.entries.entry(signature) {
            Entry::Occupied(mut occupied) => {
                // Another writer inserted the key since the first probe.
                occupied.insert(entry);
                self.release_slots(1);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(entry);
            }
        }
        Ok(())
    }

    fn sweep(&self) -> usize {
        let now = self.clock.now_ms();
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            let keep = entry.is_fresh(now);
            if !keep {
                removed += 1;
            }
            keep
        });
        self.release_slots(removed);

        if removed > 0 {
            tracing::debug!(removed, remaining = self.entries.len(), "Swept response cache");
        }
        removed
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
