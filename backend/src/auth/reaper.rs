//! Background purge of expired refresh credential records.
//!
//! The reaper owns one tokio task ticking on a fixed interval. Each tick runs
//! a single bulk purge and is awaited before the next one, so purges never
//! overlap; ticks missed while a purge was running are skipped. Failures are
//! logged and retried on the next tick.

use crate::auth::store::TokenStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, error, info};

pub struct ExpiryReaper {
    tokens: Arc<dyn TokenStore>,
    interval: Duration,
}

/// Owner of a running reaper. Dropping it also stops the task.
pub struct ReaperHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ExpiryReaper {
    pub fn new(tokens: Arc<dyn TokenStore>, interval: Duration) -> Self {
        Self { tokens, interval }
    }

    /// Spawns the purge loop. The first purge runs one interval from now.
    pub fn spawn(self) -> ReaperHandle {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            info!(interval_secs = self.interval.as_secs(), "Expiry reaper started");

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => self.purge().await,
                }
            }

            info!("Expiry reaper stopped");
        });

        ReaperHandle {
            shutdown: Some(shutdown_tx),
            task: Some(task),
        }
    }

    async fn purge(&self) {
        match self.tokens.purge_expired_tokens().await {
            Ok(purged) => debug!(purged, "Purged expired tokens"),
            Err(e) => error!("Failed to purge expired tokens: {:#}", e),
        }
    }
}

impl ReaperHandle {
    /// Signals the task to stop and waits for it to finish.
    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!("Expiry reaper task failed: {}", e);
            }
        }
    }
}

impl Drop for ReaperHandle {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}
