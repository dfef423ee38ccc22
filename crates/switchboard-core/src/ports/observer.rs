//! Decision observer port - sink for admission and cache decisions.

use std::sync::Mutex;

use crate::domain::DecisionEvent;

/// Receives one event per admission decision and per cache hit.
///
/// Called on the request path: implementations must not block and must not fail.
pub trait DecisionObserver: Send + Sync {
    fn record(&self, event: &DecisionEvent);
}

/// Observer that discards everything.
#[derive(Debug, Default)]
pub struct NoopObserver;

impl DecisionObserver for NoopObserver {
    fn record(&self, _event: &DecisionEvent) {}
}

/// Observer that keeps every event in memory, for tests and debugging.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<DecisionEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn events(&self) -> Vec<DecisionEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl DecisionObserver for RecordingObserver {
    fn record(&self, event: &DecisionEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event.clone());
    }
}
