//! Background task that applies periodic resets.
//!
//! The sweeper is optional: hosts that drive resets from their own scheduler
//! can call [`SequenceAllocator::reset_all_due`] directly.

use std::time::Duration;

use time::OffsetDateTime;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info};

use crate::allocator::SequenceAllocator;
use crate::config::SweeperConfig;

const MIN_INTERVAL: Duration = Duration::from_millis(10);

/// Walks all counters on a fixed interval and resets those whose period ended.
pub struct ResetSweeper {
    allocator: SequenceAllocator,
    interval: Duration,
}

impl ResetSweeper {
    pub fn new(allocator: SequenceAllocator, interval: Duration) -> Self {
        Self {
            allocator,
            interval,
        }
    }

    pub fn from_config(allocator: SequenceAllocator, config: &SweeperConfig) -> Self {
        Self::new(allocator, config.interval())
    }

    /// Runs one pass. Returns how many counters were reset.
    pub async fn sweep_once(&self, now: OffsetDateTime) -> usize {
        match self.allocator.reset_all_due(now).await {
            Ok(reset) => {
                if reset.is_empty() {
                    debug!("No counters due for periodic reset");
                } else {
                    info!(count = reset.len(), "Periodic reset sweep completed");
                }
                reset.len()
            }
            Err(e) => {
                error!(error = %e, "Periodic reset sweep failed");
                0
            }
        }
    }

    /// Starts the sweeper in a background task. The first pass runs immediately.
    pub fn start(self) -> SweeperHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            info!(
                interval_secs = self.interval.as_secs(),
                "Reset sweeper started"
            );

            let mut ticker = interval(self.interval.max(MIN_INTERVAL));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.sweep_once(OffsetDateTime::now_utc()).await;
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            info!("Reset sweeper shutting down");
                            break;
                        }
                    }
                }
            }
        });

        SweeperHandle {
            shutdown: shutdown_tx,
            task,
        }
    }
}

/// Handle to a running [`ResetSweeper`].
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Signals the sweeper to stop and waits for the task to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            error!(error = %e, "Reset sweeper task ended abnormally");
        }
    }
}
