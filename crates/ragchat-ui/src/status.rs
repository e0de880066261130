use ragchat_client::{ApiError, ChatBackend};
use ragchat_types::{HealthResponse, StatsResponse};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::shell::AppEvent;

const MIN_PERIOD: Duration = Duration::from_millis(100);

/// Polling periods for the status widget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollIntervals {
    pub health: Duration,
    pub stats: Duration,
}

impl Default for PollIntervals {
    fn default() -> Self {
        Self {
            health: Duration::from_secs(30),
            stats: Duration::from_secs(60),
        }
    }
}

/// Last known backend health and index stats
#[derive(Debug, Default)]
pub struct StatusView {
    health: Option<HealthResponse>,
    stats: Option<StatsResponse>,
    health_settled: bool,
}

impl StatusView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn health(&self) -> Option<&HealthResponse> {
        self.health.as_ref()
    }

    pub fn stats(&self) -> Option<&StatsResponse> {
        self.stats.as_ref()
    }

    /// No health answer (good or bad) has arrived yet
    pub fn is_loading(&self) -> bool {
        !self.health_settled
    }

    pub fn is_healthy(&self) -> bool {
        self.health.as_ref().map(HealthResponse::is_healthy).unwrap_or(false)
    }

    /// A failed poll keeps the previous value
    pub fn apply_health(&mut self, result: Result<HealthResponse, ApiError>) {
        self.health_settled = true;
        match result {
            Ok(health) => self.health = Some(health),
            Err(err) => tracing::debug!(error = %err, "Health poll failed, keeping last value"),
        }
    }

    pub fn apply_stats(&mut self, result: Result<StatsResponse, ApiError>) {
        match result {
            Ok(stats) => self.stats = Some(stats),
            Err(err) => tracing::debug!(error = %err, "Stats poll failed, keeping last value"),
        }
    }
}

/// Two independent polling loops feeding the shell's event channel
///
/// The first poll of each loop fires immediately. Both loops stop when the
/// poller is dropped or the channel closes.
pub struct StatusPoller {
    health: JoinHandle<()>,
    stats: JoinHandle<()>,
}

impl StatusPoller {
    pub fn spawn(
        backend: Arc<dyn ChatBackend>,
        intervals: PollIntervals,
        events: mpsc::Sender<AppEvent>,
    ) -> Self {
        let health_backend = Arc::clone(&backend);
        let health_events = events.clone();
        let health = tokio::spawn(async move {
            let mut ticker = interval(intervals.health.max(MIN_PERIOD));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let result = health_backend.get_health().await;
                if health_events.send(AppEvent::Health(result)).await.is_err() {
                    break;
                }
            }
        });

        let stats = tokio::spawn(async move {
            let mut ticker = interval(intervals.stats.max(MIN_PERIOD));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let result = backend.get_stats().await;
                if events.send(AppEvent::Stats(result)).await.is_err() {
                    break;
                }
            }
        });

        tracing::debug!(
            health_secs = intervals.health.as_secs(),
            stats_secs = intervals.stats.as_secs(),
            "Status polling started"
        );

        Self { health, stats }
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        self.health.abort();
        self.stats.abort();
    }
}
