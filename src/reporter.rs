//! Periodic stats logging
//!
//! Logs each namespace's request total, QPS, uptime and byte rates at a
//! fixed interval, the way an operator would tail them without a scraper.

use crate::metrics::Metrics;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Spawn a task that logs a stats line per namespace every `interval`
///
/// The task runs until aborted.
pub fn start_stats_logger(metrics: Vec<Metrics>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // First tick completes immediately; skip it so the first line has data
        ticker.tick().await;

        loop {
            ticker.tick().await;
            for m in &metrics {
                log_stats(m);
            }
        }
    })
}

fn log_stats(metrics: &Metrics) {
    let snapshot = metrics.snapshot();
    tracing::info!(
        namespace = metrics.namespace(),
        total_request = snapshot.total_request,
        qps = snapshot.qps,
        uptime = snapshot.uptime,
        received_bytes_per_sec = snapshot.current_received_bytes,
        sent_bytes_per_sec = snapshot.current_sent_bytes,
        "Request stats"
    );
}
