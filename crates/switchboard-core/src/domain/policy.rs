use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Two-horizon fixed-window limit.
///
/// The burst window is a sub-constraint of the sustained budget: it must be
/// shorter and may not allow more requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    pub sustained_window_ms: i64,
    pub sustained_max: u32,
    pub burst_window_ms: i64,
    pub burst_max: u32,
}

impl Policy {
    pub const fn new(
        sustained_max: u32,
        sustained_window_ms: i64,
        burst_max: u32,
        burst_window_ms: i64,
    ) -> Self {
        Self {
            sustained_window_ms,
            sustained_max,
            burst_window_ms,
            burst_max,
        }
    }

    /// Check the policy invariants.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.sustained_window_ms <= 0 || self.burst_window_ms <= 0 {
            return Err(DomainError::Validation(
                "policy windows must be positive".to_string(),
            ));
        }
        if self.sustained_max == 0 || self.burst_max == 0 {
            return Err(DomainError::Validation(
                "policy ceilings must be non-zero".to_string(),
            ));
        }
        if self.burst_window_ms >= self.sustained_window_ms {
            return Err(DomainError::Validation(format!(
                "burst window {}ms must be shorter than sustained window {}ms",
                self.burst_window_ms, self.sustained_window_ms
            )));
        }
        if self.burst_max > self.sustained_max {
            return Err(DomainError::Validation(format!(
                "burst ceiling {} exceeds sustained ceiling {}",
                self.burst_max, self.sustained_max
            )));
        }
        Ok(())
    }

    /// Window length and ceiling for one horizon.
    pub fn horizon(&self, horizon: Horizon) -> (i64, u32) {
        match horizon {
            Horizon::Sustained => (self.sustained_window_ms, self.sustained_max),
            Horizon::Burst => (self.burst_window_ms, self.burst_max),
        }
    }
}

/// One of the two counting horizons of a [`Policy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Horizon {
    Sustained,
    Burst,
}

impl Horizon {
    pub fn as_str(&self) -> &'static str {
        match self {
            Horizon::Sustained => "sustained",
            Horizon::Burst => "burst",
        }
    }
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Policy selected for a request, with the counter namespace it applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPolicy {
    /// Counter scope, e.g. `messages` or `general`.
    pub scope: String,
    pub policy: Policy,
}
