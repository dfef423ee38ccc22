//! Application configuration loaded from environment variables.
//!
//! Rate-limit policy tables are compiled in (see
//! `switchboard_core::admission::PolicyTable::builtin`); only operational
//! knobs come from the environment.

use std::env;
use std::net::IpAddr;
use std::time::Duration;

use switchboard_infra::{ResponseCacheConfig, SweepConfig};

#[cfg(feature = "auth")]
use switchboard_infra::JwtConfig;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub sweep: SweepConfig,
    pub response_cache: ResponseCacheConfig,
    /// TTL for cacheable routes without their own.
    pub response_cache_ttl: Duration,
    /// Capacity of the decision event channel.
    pub decision_event_buffer: usize,
    /// Peers allowed to set `X-Forwarded-For`.
    pub trusted_proxies: Vec<IpAddr>,
    #[cfg(feature = "auth")]
    pub jwt: JwtConfig,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            sweep: SweepConfig::from_env(),
            response_cache: ResponseCacheConfig::from_env(),
            response_cache_ttl: Duration::from_secs(
                env::var("RESPONSE_CACHE_TTL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            decision_event_buffer: env::var("DECISION_EVENT_BUFFER")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1024),
            trusted_proxies: env::var("TRUSTED_PROXIES")
                .map(|raw| parse_trusted_proxies(&raw))
                .unwrap_or_default(),
            #[cfg(feature = "auth")]
            jwt: JwtConfig::from_env(),
        }
    }
}

/// Comma-separated IP addresses. Unparseable entries are skipped.
fn parse_trusted_proxies(raw: &str) -> Vec<IpAddr> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| match entry.parse() {
            Ok(ip) => Some(ip),
            Err(_) => {
                tracing::warn!(entry, "Ignoring invalid TRUSTED_PROXIES entry");
                None
            }
        })
        .collect()
}
