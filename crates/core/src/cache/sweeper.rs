//! Background expiry sweeper.
//!
//! Periodically drops expired entries from a [`FileCache`] and deletes their
//! files. The loop runs until its cancellation token fires; it holds nothing
//! that needs flushing, so cancelling mid-sweep is safe.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;

use super::file_cache::FileCache;

/// Default time between sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Counters reported when the sweeper stops.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    /// Sweeps completed.
    pub cycles: u64,
    /// Entries removed across all sweeps.
    pub removed: u64,
}

/// Periodic expiry task for a [`FileCache`].
#[derive(Debug)]
pub struct Sweeper {
    cache: Arc<FileCache>,
    interval: Duration,
    shutdown: CancellationToken,
}

impl Sweeper {
    /// Create a sweeper that runs every `interval` until `shutdown` is
    /// cancelled. A zero interval is raised to one millisecond.
    pub fn new(cache: Arc<FileCache>, interval: Duration, shutdown: CancellationToken) -> Self {
        Self { cache, interval: interval.max(Duration::from_millis(1)), shutdown }
    }

    /// Run the sweeper on the current tokio runtime.
    pub fn spawn(self) -> JoinHandle<SweepStats> {
        tokio::spawn(self.run())
    }

    /// Sweep on every tick until cancelled.
    ///
    /// The first sweep happens one interval after start.
    pub async fn run(self) -> SweepStats {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            interval_ms = self.interval.as_millis() as u64,
            path = %self.cache.base_path().display(),
            "cache sweeper started"
        );

        let mut stats = SweepStats::default();
        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => break,

                _ = ticker.tick() => {
                    let removed = self.cache.sweep_expired().await;
                    stats.cycles += 1;
                    stats.removed += removed as u64;
                    if removed > 0 {
                        tracing::info!(removed, remaining = self.cache.len(), "swept expired cache entries");
                    }
                }
            }
        }

        tracing::info!(cycles = stats.cycles, removed = stats.removed, "cache sweeper stopped");
        stats
    }
}
