// src/guard/sweeper.rs
use super::overload::OverloadGuard;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, info};

/// Background task that ages out idle rate windows so the guard's map does
/// not grow with every source key ever seen.
pub struct WindowSweeper {
    guard: Arc<OverloadGuard>,
    period: Duration,
    shutdown_tx: tokio::sync::watch::Sender<bool>,
    shutdown_rx: tokio::sync::watch::Receiver<bool>,
}

impl WindowSweeper {
    pub fn new(guard: Arc<OverloadGuard>, period: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
        Self {
            guard,
            period,
            shutdown_tx,
            shutdown_rx,
        }
    }

    pub async fn start(self: Arc<Self>) {
        let mut ticker = interval(self.period);
        let mut shutdown_rx = self.shutdown_rx.clone();

        info!(period = ?self.period, "starting rate window sweeper");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let evicted = self.guard.evict_idle(Utc::now());
                    if evicted > 0 {
                        debug!(evicted, remaining = self.guard.tracked_sources(),
                               "evicted idle rate windows");
                    }
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("rate window sweeper shutting down");
                        break;
                    }
                }
            }
        }
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}
