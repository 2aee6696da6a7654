//! Periodic gauge reporting.
//!
//! A background task scans the registry on the configured interval and
//! publishes the three live-state gauges. The loop runs until
//! [`ConnTracker::stop`] cancels it; cancellation takes effect within one
//! tick.

use crate::tracker::ConnTracker;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::debug;

impl ConnTracker {
    /// Spawn the reporting loop onto the current tokio runtime.
    pub fn spawn_reporter(self: &Arc<Self>) -> JoinHandle<()> {
        let tracker = Arc::clone(self);
        tokio::spawn(async move { tracker.run().await })
    }

    /// Tick on the configured interval until [`stop`](Self::stop) is called.
    ///
    /// Ticks never overlap: each `report` completes before the next tick is
    /// awaited. Returns immediately if the tracker was stopped before the
    /// loop started.
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(self.interval);
        // First tick fires immediately, we don't want that
        ticker.tick().await;
        debug!(interval = ?self.interval, "Connection-state reporter started");
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    debug!("Connection-state reporter stopped");
                    return;
                }
                _ = ticker.tick() => self.report(),
            }
        }
    }

    /// Publish gauges for the current registry contents.
    pub fn report(&self) {
        let tally = self.tally();
        let _guard = self.emit_lock.lock();
        self.sink.gauge(&self.config.new_gauge, tally.new as f64);
        self.sink.gauge(&self.config.active_gauge, tally.active as f64);
        self.sink.gauge(&self.config.idle_gauge, tally.idle as f64);
    }

    /// Signal the reporting loop to exit.
    ///
    /// Idempotent, and safe to call before the loop has started: the loop
    /// then exits on entry instead of ticking.
    pub fn stop(&self) {
        self.shutdown.cancel();
    }
}
