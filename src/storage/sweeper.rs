//! Background Expiry Sweeper
//!
//! Periodically runs [`LocalStore::sweep_expired`] on a blocking thread.
//! A single loop drives every sweep and waits for it to finish before the
//! next tick, so two sweeps never run at the same time.

use super::local::{LocalStore, SweepPolicy};
use super::record::now_ms;

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub struct ExpirySweeper {
    store: Arc<LocalStore>,
    policy: SweepPolicy,
    interval: Duration,
}

impl ExpirySweeper {
    pub fn new(store: Arc<LocalStore>, policy: SweepPolicy, interval: Duration) -> Arc<Self> {
        Arc::new(Self {
            store,
            policy,
            interval,
        })
    }

    /// Spawns the sweep loop and returns immediately.
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        tracing::info!(
            "Starting expiry sweeper (policy: {:?}, interval: {:?})",
            self.policy,
            self.interval
        );

        tokio::spawn(async move {
            self.sweep_loop().await;
        })
    }

    async fn sweep_loop(&self) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately; nothing has expired yet at boot.
        interval.tick().await;

        loop {
            interval.tick().await;
            self.sweep_once().await;
        }
    }

    /// Runs one sweep and returns how many records were removed.
    pub async fn sweep_once(&self) -> usize {
        let store = self.store.clone();
        let policy = self.policy;

        let result =
            tokio::task::spawn_blocking(move || store.sweep_expired(policy, now_ms())).await;

        match result {
            Ok(Ok(removed)) => {
                if removed > 0 {
                    tracing::info!("Expiry sweep removed {} records", removed);
                } else {
                    tracing::debug!("Expiry sweep found nothing to remove");
                }
                removed
            }
            Ok(Err(e)) => {
                tracing::error!("Expiry sweep failed: {}", e);
                0
            }
            Err(e) => {
                tracing::error!("Expiry sweep task panicked: {}", e);
                0
            }
        }
    }
}
