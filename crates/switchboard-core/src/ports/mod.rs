//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that infrastructure must implement.

mod auth;
mod cache;
mod clock;
mod observer;
mod rate_limit;
mod repository;

pub use auth::{AuthError, TokenClaims, TokenService};
pub use cache::{CacheError, CachedResponse, ResponseCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use observer::{DecisionObserver, NoopObserver, RecordingObserver};
pub use rate_limit::{CounterKey, RateLimitError, WindowCounterStore, window_index, window_reset_ms};
pub use repository::{ContactRepository, ConversationRepository};
