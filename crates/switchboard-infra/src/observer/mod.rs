//! Decision observers - where admission and cache decisions are reported.

mod channel;
mod logging;

use std::sync::Arc;

use switchboard_core::domain::DecisionEvent;
use switchboard_core::ports::DecisionObserver;

pub use channel::{ChannelDecisionObserver, DecisionSummary, spawn_decision_summary};
pub use logging::TracingDecisionObserver;

/// Forwards every event to each inner observer, in order.
pub struct FanoutDecisionObserver {
    observers: Vec<Arc<dyn DecisionObserver>>,
}

impl FanoutDecisionObserver {
    pub fn new(observers: Vec<Arc<dyn DecisionObserver>>) -> Self {
        Self { observers }
    }
}

impl DecisionObserver for FanoutDecisionObserver {
    fn record(&self, event: &DecisionEvent) {
        for observer in &self.observers {
            observer.record(event);
        }
    }
}
