//! The admission gate.

use std::sync::Arc;

use chrono::Utc;

use crate::domain::{Caller, DecisionEvent, DecisionKind, GateResult};
use crate::error::GateError;
use crate::ports::{Clock, CounterKey, DecisionObserver, WindowCounterStore};

use super::{PathPattern, PolicyResolver};

/// Paths that bypass admission control entirely.
///
/// This is an allow-list, not a zero-limit policy: the gate is never
/// evaluated for these paths and no rate-limit headers are set.
#[derive(Debug, Clone)]
pub struct ExemptPaths {
    patterns: Vec<PathPattern>,
}

impl ExemptPaths {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns.into_iter().map(PathPattern::new).collect(),
        }
    }

    /// Auth, health and real-time handshake endpoints.
    pub fn builtin() -> Self {
        Self::new(["/api/auth", "/api/health", "/api/handshake", "/socket.io"])
    }

    pub fn is_exempt(&self, path: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(path))
    }
}

/// Decides per identity and endpoint whether a request may proceed.
///
/// Owns nothing but handles: the counter store, observer and clock are
/// injected, so tests can drive it with a manual clock.
pub struct AdmissionGate {
    resolver: PolicyResolver,
    store: Arc<dyn WindowCounterStore>,
    observer: Arc<dyn DecisionObserver>,
    clock: Arc<dyn Clock>,
    exempt: ExemptPaths,
}

impl AdmissionGate {
    pub fn new(
        resolver: PolicyResolver,
        store: Arc<dyn WindowCounterStore>,
        observer: Arc<dyn DecisionObserver>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            resolver,
            store,
            observer,
            clock,
            exempt: ExemptPaths::builtin(),
        }
    }

    pub fn is_exempt(&self, path: &str) -> bool {
        self.exempt.is_exempt(path)
    }

    /// Count the request and decide. Emits exactly one observer event.
    ///
    /// An `Err` means the gate's own bookkeeping failed; callers are expected
    /// to let the request through and report it via [`Self::record_fail_open`].
    pub fn check(&self, caller: &Caller, path: &str) -> Result<GateResult, GateError> {
        let resolved = self.resolver.resolve(caller.role, path);
        let key = CounterKey::new(caller.identity.as_str(), resolved.scope.as_str());

        let decision = self.store.check_and_increment(&key, &resolved.policy)?;

        let retry_after_sec = if decision.allowed {
            0
        } else {
            let wait_ms = decision.reset_at_ms.saturating_sub(self.clock.now_ms()).max(0);
            (wait_ms.div_euclid(1000) + i64::from(wait_ms % 1000 != 0)).max(1) as u64
        };

        let result = GateResult {
            allowed: decision.allowed,
            retry_after_sec,
            limit: decision.limit,
            remaining: decision.remaining,
            reset_epoch_sec: ceil_secs(decision.reset_at_ms),
            scope: resolved.scope,
            window_ms: decision.window_ms,
            violated_scope: decision.violated_scope,
        };

        self.observer.record(&DecisionEvent {
            timestamp: Utc::now(),
            identity: caller.identity.clone(),
            role: caller.role,
            path: path.to_string(),
            decision: if result.allowed {
                DecisionKind::Allowed
            } else {
                DecisionKind::Denied
            },
            violated_scope: result.violated_scope,
            limit: Some(result.limit),
            remaining: Some(result.remaining),
        });

        Ok(result)
    }

    /// Report that a request is proceeding without admission control.
    pub fn record_fail_open(&self, caller: &Caller, path: &str, error: &GateError) {
        tracing::error!(
            identity = %caller.identity,
            path = %path,
            error = %error,
            "Admission gate failed, failing open"
        );

        self.observer.record(&DecisionEvent {
            timestamp: Utc::now(),
            identity: caller.identity.clone(),
            role: caller.role,
            path: path.to_string(),
            decision: DecisionKind::FailOpen,
            violated_scope: None,
            limit: None,
            remaining: None,
        });
    }
}

fn ceil_secs(ms: i64) -> i64 {
    (ms + 999).div_euclid(1000)
}
