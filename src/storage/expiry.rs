//! Active expiry
//!
//! Reads already treat an elapsed key as absent, but nothing removes it.
//! A key that is never touched again would stay in memory forever, so a
//! background task calls [`StorageEngine::active_sweep`] on a fixed tick.
//!
//! The tick does not back off when the keyspace is idle, and one sweep
//! removes at most the engine's sample size worth of keys.

use crate::storage::StorageEngine;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Default interval between two sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_millis(100);

/// Shorter intervals, including zero, are raised to this.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone)]
pub struct ExpiryConfig {
    /// Time between two sweeps
    pub interval: Duration,
}

impl Default for ExpiryConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

/// Owns the background sweep task. Dropping it stops the task.
#[derive(Debug)]
pub struct ExpirySweeper {
    stop_tx: watch::Sender<bool>,
}

impl ExpirySweeper {
    /// Spawns the sweep task on the current Tokio runtime.
    ///
    /// ```
    /// use sparkkv::storage::{ExpiryConfig, ExpirySweeper, StorageEngine};
    /// use std::sync::Arc;
    ///
    /// # #[tokio::main]
    /// # async fn main() {
    /// let engine = Arc::new(StorageEngine::new());
    /// let sweeper = ExpirySweeper::start(engine, ExpiryConfig::default());
    /// drop(sweeper);
    /// # }
    /// ```
    pub fn start(engine: Arc<StorageEngine>, config: ExpiryConfig) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        let interval = config.interval.max(MIN_SWEEP_INTERVAL);

        info!(
            interval_ms = interval.as_millis() as u64,
            sample_size = engine.sample_size(),
            "Expiry sweeper started"
        );
        tokio::spawn(run_sweeps(engine, interval, stop_rx));

        Self { stop_tx }
    }

    /// Signals the task to finish. Later calls do nothing.
    pub fn stop(&self) {
        let newly_stopped = self.stop_tx.send_if_modified(|stopped| {
            let changed = !*stopped;
            *stopped = true;
            changed
        });
        if newly_stopped {
            info!("Expiry sweeper stopped");
        }
    }
}

impl Drop for ExpirySweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_sweeps(
    engine: Arc<StorageEngine>,
    interval: Duration,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let removed = engine.active_sweep();
                if removed > 0 {
                    debug!(removed, remaining = engine.len(), "Swept expired keys");
                }
            }
            changed = stop_rx.changed() => {
                // A dropped sender also ends the task.
                if changed.is_err() || *stop_rx.borrow() {
                    return;
                }
            }
        }
    }
}
