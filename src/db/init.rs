//! Store initialization with bounded retry.
//!
//! The store may still be starting when the service comes up (e.g. a database
//! container launched alongside it), so table creation is retried in the
//! background with exponential backoff while requests are already being served.

use super::TaskStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Initialization state of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreStatus {
    /// Table creation has not succeeded yet; retries may be in progress.
    Pending,
    /// The `tasks` table exists.
    Ready,
    /// Every attempt failed.
    Failed,
}

impl StoreStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreStatus::Pending => "pending",
            StoreStatus::Ready => "ready",
            StoreStatus::Failed => "failed",
        }
    }
}

/// Backoff settings for store initialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitPolicy {
    /// Delay after the first failed attempt.
    #[serde(default = "default_initial_ms")]
    pub initial_ms: u64,

    /// Upper bound on the delay between attempts.
    #[serde(default = "default_max_ms")]
    pub max_ms: u64,

    /// Factor applied to the delay after each failure.
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    /// Random spread applied to each delay, in either direction.
    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,

    /// Attempts before giving up. Zero is treated as one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for InitPolicy {
    fn default() -> Self {
        Self {
            initial_ms: default_initial_ms(),
            max_ms: default_max_ms(),
            multiplier: default_multiplier(),
            jitter_ms: default_jitter_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_initial_ms() -> u64 {
    2000
}

fn default_max_ms() -> u64 {
    30_000
}

fn default_multiplier() -> f64 {
    1.5
}

fn default_jitter_ms() -> u64 {
    250
}

fn default_max_attempts() -> u32 {
    30
}

impl InitPolicy {
    /// Delay before the attempt following `current_ms`, capped at `max_ms`.
    pub fn next_delay_ms(&self, current_ms: u64) -> u64 {
        ((current_ms as f64 * self.multiplier) as u64).min(self.max_ms)
    }
}

/// `base_ms` shifted by up to `jitter_ms` either way, never below 1 ms. The
/// spread is taken from the sub-second clock, which is enough to keep
/// restarted replicas from retrying in lockstep.
fn compute_jittered_delay(base_ms: u64, jitter_ms: u64) -> Duration {
    use std::time::SystemTime;

    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);

    // Never wider than the base delay, nor than the clock offset can cover
    let jitter_ms = jitter_ms.min(base_ms.max(1)).min(500_000_000);
    let span = jitter_ms.saturating_mul(2);
    if span == 0 {
        return Duration::from_millis(base_ms.max(1));
    }
    let offset = u64::from(nanos) % span;
    let delay_ms = base_ms.saturating_add(offset).saturating_sub(jitter_ms);
    Duration::from_millis(delay_ms.max(1))
}

/// Create the table, retrying with backoff until it succeeds or the attempt
/// budget is spent. Publishes every state change on `status_tx`.
pub async fn run_store_init(
    store: Arc<dyn TaskStore>,
    policy: InitPolicy,
    status_tx: watch::Sender<StoreStatus>,
) -> StoreStatus {
    let max_attempts = policy.max_attempts.max(1);
    let mut current_delay_ms = policy.initial_ms;

    for attempt in 1..=max_attempts {
        match store.init().await {
            Ok(()) => {
                info!(
                    backend = store.backend(),
                    attempt, "Database initialized successfully"
                );
                let _ = status_tx.send(StoreStatus::Ready);
                return StoreStatus::Ready;
            }
            Err(e) if attempt == max_attempts => {
                error!(
                    backend = store.backend(),
                    attempt,
                    "Database initialization failed, giving up: {}",
                    e
                );
            }
            Err(e) => {
                warn!(
                    backend = store.backend(),
                    attempt,
                    "Database initialization error: {}. Retrying in {:.1}s...",
                    e,
                    current_delay_ms as f64 / 1000.0
                );
                let delay = compute_jittered_delay(current_delay_ms, policy.jitter_ms);
                tokio::time::sleep(delay).await;
                current_delay_ms = policy.next_delay_ms(current_delay_ms);
            }
        }
    }

    let _ = status_tx.send(StoreStatus::Failed);
    StoreStatus::Failed
}

/// Run [`run_store_init`] on its own task.
///
/// Returns the task handle and a receiver that tracks the current status.
pub fn spawn_store_init(
    store: Arc<dyn TaskStore>,
    policy: InitPolicy,
) -> (JoinHandle<StoreStatus>, watch::Receiver<StoreStatus>) {
    let (status_tx, status_rx) = watch::channel(StoreStatus::Pending);
    let handle = tokio::spawn(run_store_init(store, policy, status_tx));
    (handle, status_rx)
}
