//! Window counter store port.

use crate::domain::{Decision, Policy};

/// Counter namespace: one identity within one policy scope.
///
/// The window index is not part of the map key; each entry remembers the
/// window it counts and is reset when a request lands in a newer one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CounterKey {
    pub identity: String,
    pub scope: String,
}

impl CounterKey {
    pub fn new(identity: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            scope: scope.into(),
        }
    }
}

/// Fixed window a timestamp falls in. A timestamp exactly on a boundary
/// belongs to the new window.
pub fn window_index(now_ms: i64, window_ms: i64) -> i64 {
    now_ms.div_euclid(window_ms)
}

/// First millisecond of the window after `index`.
pub fn window_reset_ms(index: i64, window_ms: i64) -> i64 {
    index.saturating_add(1).saturating_mul(window_ms)
}

/// Counter store trait - fixed-window counters for the sustained and burst horizons.
pub trait WindowCounterStore: Send + Sync {
    /// Count one attempt against both horizons and decide whether it is admitted.
    ///
    /// Must be atomic per key: concurrent callers on the same key can never
    /// be admitted beyond the configured ceilings.
    fn check_and_increment(
        &self,
        key: &CounterKey,
        policy: &Policy,
    ) -> Result<Decision, RateLimitError>;

    /// Drop entries whose windows have all closed. Returns how many were removed.
    fn sweep(&self) -> usize;

    /// Number of live entries.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Rate limit errors.
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("Invalid counter key: {0}")]
    InvalidKey(String),

    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_belongs_to_new_window() {
        assert_eq!(window_index(59_999, 60_000), 0);
        assert_eq!(window_index(60_000, 60_000), 1);
        assert_eq!(window_reset_ms(1, 60_000), 120_000);
    }
}
