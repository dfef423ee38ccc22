//! Periodic eviction of expired counters and stale cache entries.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use switchboard_core::ports::{ResponseCache, WindowCounterStore};

/// Sweep interval configuration.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    pub interval: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
        }
    }
}

impl SweepConfig {
    pub fn from_env() -> Self {
        Self {
            interval: Duration::from_secs(
                std::env::var("SWEEP_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .filter(|secs| *secs > 0)
                    .unwrap_or(60),
            ),
        }
    }
}

/// Entries removed by one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub counters: usize,
    pub cache_entries: usize,
}

/// Background task that keeps both in-memory maps bounded to recently active keys.
pub struct Sweeper {
    counters: Arc<dyn WindowCounterStore>,
    cache: Arc<dyn ResponseCache>,
    config: SweepConfig,
}

impl Sweeper {
    pub fn new(
        counters: Arc<dyn WindowCounterStore>,
        cache: Arc<dyn ResponseCache>,
        config: SweepConfig,
    ) -> Self {
        Self {
            counters,
            cache,
            config,
        }
    }

    pub fn sweep_once(&self) -> SweepReport {
        SweepReport {
            counters: self.counters.sweep(),
            cache_entries: self.cache.sweep(),
        }
    }

    /// Run until `shutdown_token` is cancelled.
    pub fn spawn(self, shutdown_token: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!(
                interval_secs = self.config.interval.as_secs(),
                "Sweeper started"
            );

            let mut interval = tokio::time::interval(self.config.interval);
            // The first tick completes immediately; nothing to sweep yet.
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let report = self.sweep_once();
                        tracing::debug!(
                            counters = report.counters,
                            cache_entries = report.cache_entries,
                            live_counters = self.counters.len(),
                            live_cache_entries = self.cache.len(),
                            "Sweep finished"
                        );
                    }
                    _ = shutdown_token.cancelled() => {
                        tracing::info!("Sweeper shutting down");
                        break;
                    }
                }
            }
        })
    }
}
