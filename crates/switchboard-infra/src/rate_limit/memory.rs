//! In-memory fixed-window counter store.
//!
//! Counters live in a sharded concurrent map keyed by `(identity, scope)`.
//! Each entry holds both horizons, and the shard lock taken by
//! `DashMap::entry` makes check-then-increment atomic for that key while
//! other keys proceed in parallel.
//!
//! Known trade-off: fixed windows admit up to twice the ceiling across a
//! window boundary.
//! Note: Counters are per-process and lost on restart.

use std::sync::Arc;

use dashmap::DashMap;

use switchboard_core::domain::{Decision, Horizon, Policy};
use switchboard_core::ports::{
    Clock, CounterKey, RateLimitError, WindowCounterStore, window_index, window_reset_ms,
};

/// Count for one horizon in its current window.
#[derive(Debug, Clone, Copy)]
struct CounterEntry {
    window_ms: i64,
    window_index: i64,
    count: u32,
    reset_at_ms: i64,
}

impl CounterEntry {
    fn open(now_ms: i64, window_ms: i64) -> Self {
        let index = window_index(now_ms, window_ms);
        Self {
            window_ms,
            window_index: index,
            count: 0,
            reset_at_ms: window_reset_ms(index, window_ms),
        }
    }

    /// Start over if `now_ms` is in a later window (or the window length changed).
    fn roll(&mut self, now_ms: i64, window_ms: i64) {
        if self.window_ms != window_ms || self.window_index != window_index(now_ms, window_ms) {
            *self = Self::open(now_ms, window_ms);
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct WindowSlots {
    sustained: CounterEntry,
    burst: CounterEntry,
}

impl WindowSlots {
    fn open(now_ms: i64, policy: &Policy) -> Self {
        Self {
            sustained: CounterEntry::open(now_ms, policy.sustained_window_ms),
            burst: CounterEntry::open(now_ms, policy.burst_window_ms),
        }
    }

    fn expires_at_ms(&self) -> i64 {
        self.sustained.reset_at_ms.max(self.burst.reset_at_ms)
    }
}

/// Process-local counter store.
pub struct InMemoryWindowCounterStore {
    counters: DashMap<CounterKey, WindowSlots>,
    clock: Arc<dyn Clock>,
}

impl InMemoryWindowCounterStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            counters: DashMap::new(),
            clock,
        }
    }

    fn validate(key: &CounterKey, policy: &Policy) -> Result<(), RateLimitError> {
        if key.identity.is_empty() {
            return Err(RateLimitError::InvalidKey("empty identity".to_string()));
        }
        if key.scope.is_empty() {
            return Err(RateLimitError::InvalidKey(format!(
                "empty scope for {}",
                key.identity
            )));
        }
        policy
            .validate()
            .map_err(|e| RateLimitError::InvalidPolicy(e.to_string()))
    }
}

impl WindowCounterStore for InMemoryWindowCounterStore {
    fn check_and_increment(
        &self,
        key: &CounterKey,
        policy: &Policy,
    ) -> Result<Decision, RateLimitError> {
        Self::validate(key, policy)?;

        let now = self.clock.now_ms();
        let mut entry = self
            .counters
            .entry(key.clone())
            .or_insert_with(|| WindowSlots::open(now, policy));
        let slots = entry.value_mut();

        slots.sustained.roll(now, policy.sustained_window_ms);
        slots.burst.roll(now, policy.burst_window_ms);

        // Burst first: it is the more immediate signal for clients backing off.
        let violated = if slots.burst.count >= policy.burst_max {
            Some(Horizon::Burst)
        } else if slots.sustained.count >= policy.sustained_max {
            Some(Horizon::Sustained)
        } else {
            None
        };

        // Rejected attempts count too, so retry storms keep the pressure on.
        slots.sustained.count = slots.sustained.count.saturating_add(1);
        slots.burst.count = slots.burst.count.saturating_add(1);

        let decision = match violated {
            None => Decision {
                allowed: true,
                remaining: policy.sustained_max.saturating_sub(slots.sustained.count),
                reset_at_ms: slots.sustained.reset_at_ms,
                violated_scope: None,
                limit: policy.sustained_max,
                window_ms: policy.sustained_window_ms,
            },
            Some(horizon) => {
                let slot = match horizon {
                    Horizon::Burst => slots.burst,
                    Horizon::Sustained => slots.sustained,
                };
                let (window_ms, limit) = policy.horizon(horizon);
                Decision {
                    allowed: false,
                    remaining: 0,
                    reset_at_ms: slot.reset_at_ms,
                    violated_scope: Some(horizon),
                    limit,
                    window_ms,
                }
            }
        };

        Ok(decision)
    }

    fn sweep(&self) -> usize {
        let now = self.clock.now_ms();
        let before = self.counters.len();
        // `retain` locks one shard at a time; concurrent checks on other
        // shards are unaffected and each entry is judged on its own.
        self.counters.retain(|_, slots| slots.expires_at_ms() >= now);
        let removed = before.saturating_sub(self.counters.len());

        if removed > 0 {
            tracing::debug!(removed, remaining = self.counters.len(), "Swept rate limit counters");
        }
        removed
    }

    fn len(&self) -> usize {
        self.counters.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use switchboard_core::ports::ManualClock;

    fn store_at(now_ms: i64) -> (InMemoryWindowCounterStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(now_ms));
        (InMemoryWindowCounterStore::new(clock.clone()), clock)
    }

    #[test]
    fn test_sustained_limit_then_reset() {
        let (store, clock) = store_at(0);
        let policy = Policy::new(10, 60_000, 10, 1_000);
        let key = CounterKey::new("ana@example.com", "general");

        for i in 0..10 {
            let d = store.check_and_increment(&key, &policy).unwrap();
            assert!(d.allowed);
            assert_eq!(d.remaining, 9 - i);
            clock.advance(Duration::from_millis(1_000));
        }

        let d = store.check_and_increment(&key, &policy).unwrap();
        assert!(!d.allowed);
        assert_eq!(d.violated_scope, Some(Horizon::Sustained));
        assert_eq!(d.reset_at_ms, 60_000);

        clock.set(60_000);
        let d = store.check_and_increment(&key, &policy).unwrap();
        assert!(d.allowed);
        assert_eq!(d.remaining, 9);
    }

    #[test]
    fn test_burst_enforced_with_sustained_budget_left() {
        let (store, _) = store_at(5_000);
        let policy = Policy::new(100, 60_000, 5, 1_000);
        let key = CounterKey::new("ana@example.com", "general");

        for _ in 0..5 {
            assert!(store.check_and_increment(&key, &policy).unwrap().allowed);
        }
        let d = store.check_and_increment(&key, &policy).unwrap();
        assert!(!d.allowed);
        assert_eq!(d.violated_scope, Some(Horizon::Burst));
        assert_eq!(d.limit, 5);
        assert_eq!(d.window_ms, 1_000);
        assert_eq!(d.reset_at_ms, 6_000);
    }

    #[test]
    fn test_burst_reported_before_sustained() {
        let (store, _) = store_at(0);
        let policy = Policy::new(3, 60_000, 3, 1_000);
        let key = CounterKey::new("ana@example.com", "general");

        for _ in 0..3 {
            store.check_and_increment(&key, &policy).unwrap();
        }
        let d = store.check_and_increment(&key, &policy).unwrap();
        assert_eq!(d.violated_scope, Some(Horizon::Burst));
    }

    #[test]
    fn test_rejected_attempts_keep_counting() {
        let (store, clock) = store_at(0);
        let policy = Policy::new(3, 60_000, 2, 1_000);
        let key = CounterKey::new("ana@example.com", "general");

        store.check_and_increment(&key, &policy).unwrap();
        store.check_and_increment(&key, &policy).unwrap();
        // Rejected by burst, but still spends sustained budget.
        assert!(!store.check_and_increment(&key, &policy).unwrap().allowed);

        clock.advance(Duration::from_millis(1_000));
        let d = store.check_and_increment(&key, &policy).unwrap();
        assert!(!d.allowed);
        assert_eq!(d.violated_scope, Some(Horizon::Sustained));
    }

    #[test]
    fn test_boundary_request_lands_in_new_window() {
        let (store, clock) = store_at(59_999);
        let policy = Policy::new(2, 60_000, 2, 1_000);
        let key = CounterKey::new("ana@example.com", "general");

        assert!(store.check_and_increment(&key, &policy).unwrap().allowed);
        assert!(store.check_and_increment(&key, &policy).unwrap().allowed);

        // Up to twice the ceiling across the edge.
        clock.set(60_000);
        assert!(store.check_and_increment(&key, &policy).unwrap().allowed);
        assert!(store.check_and_increment(&key, &policy).unwrap().allowed);
        assert!(!store.check_and_increment(&key, &policy).unwrap().allowed);
    }

    #[test]
    fn test_scopes_and_identities_are_independent() {
        let (store, _) = store_at(0);
        let policy = Policy::new(1, 60_000, 1, 1_000);

        let a = CounterKey::new("ana@example.com", "messages");
        let b = CounterKey::new("ana@example.com", "general");
        let c = CounterKey::new("bo@example.com", "messages");

        assert!(store.check_and_increment(&a, &policy).unwrap().allowed);
        assert!(!store.check_and_increment(&a, &policy).unwrap().allowed);
        assert!(store.check_and_increment(&b, &policy).unwrap().allowed);
        assert!(store.check_and_increment(&c, &policy).unwrap().allowed);
    }

    #[test]
    fn test_malformed_key_and_policy_are_errors() {
        let (store, _) = store_at(0);
        let policy = Policy::new(1, 60_000, 1, 1_000);

        let err = store
            .check_and_increment(&CounterKey::new("", "general"), &policy)
            .unwrap_err();
        assert!(matches!(err, RateLimitError::InvalidKey(_)));

        let bad = Policy::new(1, 0, 1, 0);
        let err = store
            .check_and_increment(&CounterKey::new("ana", "general"), &bad)
            .unwrap_err();
        assert!(matches!(err, RateLimitError::InvalidPolicy(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_sweep_removes_only_expired_entries() {
        let (store, clock) = store_at(0);
        let policy = Policy::new(5, 60_000, 5, 1_000);

        store
            .check_and_increment(&CounterKey::new("old", "general"), &policy)
            .unwrap();
        clock.set(90_000);
        store
            .check_and_increment(&CounterKey::new("new", "general"), &policy)
            .unwrap();

        clock.set(120_000);
        assert_eq!(store.sweep(), 1);
        assert_eq!(store.len(), 1);

        clock.set(180_001);
        assert_eq!(store.sweep(), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_concurrent_callers_never_exceed_limit() {
        let (store, _) = store_at(0);
        let store = Arc::new(store);
        let policy = Policy::new(50, 60_000, 50, 1_000);
        let key = CounterKey::new("ana@example.com", "messages");

        let admitted = std::sync::atomic::AtomicU32::new(0);
        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..100 {
                        if store.check_and_increment(&key, &policy).unwrap().allowed {
                            admitted.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                        }
                    }
                });
            }
        });

        assert_eq!(admitted.into_inner(), 50);
    }
}
