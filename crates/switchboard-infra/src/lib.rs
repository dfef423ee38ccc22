//! # Switchboard Infrastructure
//!
//! Concrete implementations of the ports defined in `switchboard-core`.
//! Everything here is process-local: counters, cached responses and
//! repositories live in memory and are not shared across instances.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - No token validation
//! - `auth` - JWT bearer token validation

pub mod cache;
pub mod observer;
pub mod rate_limit;
pub mod repository;
pub mod sweep;

#[cfg(feature = "auth")]
pub mod auth;


pub use cache::{InMemoryResponseCache, ResponseCacheConfig};
pub use observer::{
    ChannelDecisionObserver, DecisionSummary, FanoutDecisionObserver, TracingDecisionObserver,
    spawn_decision_summary,
};
pub use rate_limit::InMemoryWindowCounterStore;
pub use repository::{InMemoryContactRepository, InMemoryConversationRepository};
pub use sweep::{SweepConfig, SweepReport, Sweeper};

#[cfg(feature = "auth")]
pub use auth::{JwtConfig, JwtTokenService};
