use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Horizon, Role};

/// Who is making a request, as resolved by the identity collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    /// Stable key, typically an email or an `ip:` fallback.
    pub identity: String,
    pub role: Role,
}

impl Caller {
    pub fn new(identity: impl Into<String>, role: Role) -> Self {
        Self {
            identity: identity.into(),
            role,
        }
    }

    /// Unauthenticated caller keyed by client address.
    pub fn anonymous(addr: &str) -> Self {
        Self::new(format!("ip:{addr}"), Role::Default)
    }
}

/// Outcome of a single check-and-increment on the counter store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    /// Sustained budget left after this request; 0 on deny.
    pub remaining: u32,
    /// When the reported horizon's window closes.
    pub reset_at_ms: i64,
    /// Horizon found over budget, burst reported before sustained.
    pub violated_scope: Option<Horizon>,
    /// Ceiling of the reported horizon.
    pub limit: u32,
    /// Window length of the reported horizon.
    pub window_ms: i64,
}

/// What the gate tells the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateResult {
    pub allowed: bool,
    /// Seconds until the violated window resets, at least 1 on deny; 0 when allowed.
    pub retry_after_sec: u64,
    pub limit: u32,
    pub remaining: u32,
    pub reset_epoch_sec: i64,
    pub scope: String,
    pub window_ms: i64,
    pub violated_scope: Option<Horizon>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    Allowed,
    Denied,
    CacheHit,
    FailOpen,
}

impl DecisionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionKind::Allowed => "allowed",
            DecisionKind::Denied => "denied",
            DecisionKind::CacheHit => "cache_hit",
            DecisionKind::FailOpen => "fail_open",
        }
    }
}

impl fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record handed to decision observers, one per admission or cache decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionEvent {
    pub timestamp: DateTime<Utc>,
    pub identity: String,
    pub role: Role,
    pub path: String,
    pub decision: DecisionKind,
    pub violated_scope: Option<Horizon>,
    pub limit: Option<u32>,
    pub remaining: Option<u32>,
}
