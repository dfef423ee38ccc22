//! Structured log output for decisions.

use switchboard_core::domain::{DecisionEvent, DecisionKind};
use switchboard_core::ports::DecisionObserver;

/// Emits one `tracing` event per decision under the `switchboard::admission` target.
///
/// Denials are expected traffic shaping and stay at `warn`. Fail-open is
/// logged at `error` by the gate itself; this observer only notes it.
#[derive(Debug, Default)]
pub struct TracingDecisionObserver;

impl DecisionObserver for TracingDecisionObserver {
    fn record(&self, event: &DecisionEvent) {
        match event.decision {
            DecisionKind::Allowed => tracing::debug!(
                target: "switchboard::admission",
                identity = %event.identity,
                role = %event.role,
                path = %event.path,
                limit = ?event.limit,
                remaining = ?event.remaining,
                "Request admitted"
            ),
            DecisionKind::Denied => tracing::warn!(
                target: "switchboard::admission",
                identity = %event.identity,
                role = %event.role,
                path = %event.path,
                violated_scope = ?event.violated_scope.map(|h| h.as_str()),
                limit = ?event.limit,
                "Request rate limited"
            ),
            DecisionKind::CacheHit => tracing::debug!(
                target: "switchboard::admission",
                identity = %event.identity,
                path = %event.path,
                "Served from response cache"
            ),
            DecisionKind::FailOpen => tracing::warn!(
                target: "switchboard::admission",
                identity = %event.identity,
                path = %event.path,
                "Request admitted without rate limiting"
            ),
        }
    }
}
