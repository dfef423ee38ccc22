//! Application state - shared across all handlers.

use std::sync::Arc;

use tokio::sync::mpsc;

use switchboard_core::admission::{AdmissionGate, PolicyResolver, ReadCache};
use switchboard_core::domain::DecisionEvent;
use switchboard_core::ports::{
    Clock, ContactRepository, ConversationRepository, DecisionObserver, ResponseCache,
    SystemClock, TokenService, WindowCounterStore,
};
use switchboard_infra::{
    ChannelDecisionObserver, FanoutDecisionObserver, InMemoryContactRepository,
    InMemoryConversationRepository, InMemoryResponseCache, InMemoryWindowCounterStore,
    TracingDecisionObserver,
};

#[cfg(feature = "auth")]
use switchboard_infra::JwtTokenService;

use crate::config::AppConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<AdmissionGate>,
    pub read_cache: Arc<ReadCache>,
    pub counters: Arc<dyn WindowCounterStore>,
    pub responses: Arc<dyn ResponseCache>,
    pub contacts: Arc<dyn ContactRepository>,
    pub conversations: Arc<dyn ConversationRepository>,
    pub token_service: Option<Arc<dyn TokenService>>,
}

impl AppState {
    /// Wire the in-memory stores, admission gate and observers.
    ///
    /// Also returns the receiving end of the decision event channel, which
    /// the caller hands to a summary task.
    pub fn new(config: &AppConfig) -> (Self, mpsc::Receiver<DecisionEvent>) {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let (channel, decision_events) = ChannelDecisionObserver::new(config.decision_event_buffer);
        let observer: Arc<dyn DecisionObserver> = Arc::new(FanoutDecisionObserver::new(vec![
            Arc::new(TracingDecisionObserver) as Arc<dyn DecisionObserver>,
            Arc::new(channel) as Arc<dyn DecisionObserver>,
        ]));

        let counters: Arc<dyn WindowCounterStore> =
            Arc::new(InMemoryWindowCounterStore::new(clock.clone()));
        let responses: Arc<dyn ResponseCache> = Arc::new(InMemoryResponseCache::new(
            clock.clone(),
            config.response_cache.clone(),
        ));

        let gate = AdmissionGate::new(
            PolicyResolver::builtin(),
            counters.clone(),
            observer.clone(),
            clock,
        );
        let read_cache = ReadCache::new(responses.clone(), observer, config.response_cache_ttl);

        #[cfg(feature = "auth")]
        let token_service: Option<Arc<dyn TokenService>> =
            Some(Arc::new(JwtTokenService::new(config.jwt.clone())));

        #[cfg(not(feature = "auth"))]
        let token_service: Option<Arc<dyn TokenService>> = {
            tracing::info!("Running without auth feature - all callers are anonymous");
            None
        };

        tracing::info!("Application state initialized");

        let state = Self {
            gate: Arc::new(gate),
            read_cache: Arc::new(read_cache),
            counters,
            responses,
            contacts: Arc::new(InMemoryContactRepository::new()),
            conversations: Arc::new(InMemoryConversationRepository::new()),
            token_service,
        };

        (state, decision_events)
    }
}
