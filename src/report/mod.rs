//! Periodic counters report.
//!
//! Logs registry-wide totals on a fixed interval for as long as the process
//! runs. Purely observational; a delayed or skipped tick is not an error.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::registry::SessionRegistry;

/// Spawn the reporter. It stops when `shutdown` is cancelled.
pub fn spawn_reporter(
    registry: SessionRegistry,
    period: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let counters = registry.counters();
                    info!(
                        total = counters.total,
                        connected = counters.connected,
                        subscribed = counters.subscribed,
                        "Session counters"
                    );
                }
            }
        }
    })
}
