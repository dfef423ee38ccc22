//! Read-through front for the response cache.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::domain::{Caller, DecisionEvent, DecisionKind};
use crate::ports::{CachedResponse, DecisionObserver, ResponseCache};

use super::PathPattern;

/// A cacheable GET route and its TTL (`None` uses the cache default).
#[derive(Debug, Clone)]
pub struct CacheRule {
    pub pattern: PathPattern,
    pub ttl: Option<Duration>,
}

impl CacheRule {
    pub fn new(pattern: &str) -> Self {
        Self {
            pattern: PathPattern::new(pattern),
            ttl: None,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

/// Decides what is cacheable, builds signatures and reports cache hits.
///
/// Only consulted after the admission gate has allowed a request, so a hit
/// still counts against the caller's budget.
pub struct ReadCache {
    cache: Arc<dyn ResponseCache>,
    observer: Arc<dyn DecisionObserver>,
    rules: Vec<CacheRule>,
    default_ttl: Duration,
}

impl ReadCache {
    pub fn new(
        cache: Arc<dyn ResponseCache>,
        observer: Arc<dyn DecisionObserver>,
        default_ttl: Duration,
    ) -> Self {
        Self {
            cache,
            observer,
            rules: Vec::new(),
            default_ttl,
        }
        .with_rules(Self::builtin_rules())
    }

    /// Replace the route table.
    pub fn with_rules(mut self, mut rules: Vec<CacheRule>) -> Self {
        rules.sort_by(|a, b| b.pattern.specificity().cmp(&a.pattern.specificity()));
        self.rules = rules;
        self
    }

    pub fn builtin_rules() -> Vec<CacheRule> {
        vec![
            CacheRule::new("/api/contacts"),
            CacheRule::new("/api/conversations").with_ttl(Duration::from_secs(15)),
            CacheRule::new("/api/conversations/*/messages").with_ttl(Duration::from_secs(5)),
            CacheRule::new("/api/sync/state").with_ttl(Duration::from_secs(5)),
        ]
    }

    /// Canonical key: method, path, query pairs in sorted order, identity.
    pub fn signature(method: &str, path: &str, query: &str, identity: &str) -> String {
        let mut pairs: Vec<&str> = query.split('&').filter(|p| !p.is_empty()).collect();
        pairs.sort_unstable();
        format!(
            "{} {}?{}\n{}",
            method.to_ascii_uppercase(),
            path,
            pairs.join("&"),
            identity
        )
    }

    /// TTL for a request, or `None` when it must not be cached.
    pub fn ttl_for(&self, method: &str, path: &str) -> Option<Duration> {
        if !method.eq_ignore_ascii_case("GET") {
            return None;
        }
        self.rules
            .iter()
            .find(|rule| rule.pattern.matches(path))
            .map(|rule| rule.ttl.unwrap_or(self.default_ttl))
            .filter(|ttl| !ttl.is_zero())
    }

    pub fn lookup(
        &self,
        caller: &Caller,
        path: &str,
        signature: &str,
    ) -> Option<Arc<CachedResponse>> {
        let hit = self.cache.lookup(signature)?;

        self.observer.record(&DecisionEvent {
            timestamp: Utc::now(),
            identity: caller.identity.clone(),
            role: caller.role,
            path: path.to_string(),
            decision: DecisionKind::CacheHit,
            violated_scope: None,
            limit: None,
            remaining: None,
        });

        Some(hit)
    }

    /// Store a handler response. Non-2xx responses are ignored and storage
    /// failures are logged and skipped. Returns whether the entry was written.
    pub fn store(&self, signature: String, response: CachedResponse, ttl: Duration) -> bool {
        if !(200..300).contains(&response.status) {
            return false;
        }

        match self.cache.store(signature, response, ttl) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping response cache write");
                false
            }
        }
    }
}
