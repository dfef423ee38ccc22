//! Channel-backed observer for out-of-band consumers (dashboards, alerting).

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use switchboard_core::domain::{DecisionEvent, DecisionKind};
use switchboard_core::ports::DecisionObserver;

/// Hands events to a bounded channel without ever blocking the request path.
///
/// When the consumer falls behind, events are dropped and counted.
pub struct ChannelDecisionObserver {
    sender: mpsc::Sender<DecisionEvent>,
    dropped: Arc<AtomicU64>,
}

impl ChannelDecisionObserver {
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<DecisionEvent>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (
            Self {
                sender: tx,
                dropped: Arc::new(AtomicU64::new(0)),
            },
            rx,
        )
    }

    /// Events lost to a full or closed channel.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl DecisionObserver for ChannelDecisionObserver {
    fn record(&self, event: &DecisionEvent) {
        // Non-blocking send
        if self.sender.try_send(event.clone()).is_err() {
            let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            if total.is_power_of_two() {
                tracing::warn!(dropped = total, "Decision event channel saturated");
            }
        }
    }
}

/// Decision totals for one reporting interval.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecisionSummary {
    pub allowed: u64,
    pub denied: u64,
    pub cache_hits: u64,
    pub fail_open: u64,
}

impl DecisionSummary {
    fn add(&mut self, event: &DecisionEvent) {
        match event.decision {
            DecisionKind::Allowed => self.allowed += 1,
            DecisionKind::Denied => self.denied += 1,
            DecisionKind::CacheHit => self.cache_hits += 1,
            DecisionKind::FailOpen => self.fail_open += 1,
        }
    }

    fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Drain decision events and log a summary every `interval`.
///
/// Returns the handle so callers can await the final summary after cancelling.
pub fn spawn_decision_summary(
    mut receiver: mpsc::Receiver<DecisionEvent>,
    interval: Duration,
    shutdown_token: CancellationToken,
) -> tokio::task::JoinHandle<DecisionSummary> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        let mut window = DecisionSummary::default();
        let mut total = DecisionSummary::default();

        loop {
            tokio::select! {
                Some(event) = receiver.recv() => {
                    window.add(&event);
                    total.add(&event);
                }
                _ = ticker.tick() => {
                    if !window.is_empty() {
                        tracing::info!(
                            allowed = window.allowed,
                            denied = window.denied,
                            cache_hits = window.cache_hits,
                            fail_open = window.fail_open,
                            "Admission decisions"
                        );
                    }
                    window = DecisionSummary::default();
                }
                _ = shutdown_token.cancelled() => {
                    tracing::info!("Decision summary worker shutting down");
                    break;
                }
            }
        }

        while let Ok(event) = receiver.try_recv() {
            total.add(&event);
        }
        total
    })
}
