//! Periodic rate sampler
//!
//! Converts cumulative counters into windowed rates. Ticks once per second:
//!
//! - every tick advances uptime
//! - every [`WINDOW_TICKS`] ticks the request and byte deltas since the last
//!   window boundary become the published rates, and the baseline moves up
//! - every [`DISTRIBUTION_RESET_TICKS`] ticks the backend drops its latency
//!   distribution state
//!
//! Deltas are clamped at zero and the period at one. A boundary reached
//! before any baseline exists only seeds the baseline.

use crate::metrics::counters::{BaselineValues, MetricsState};
use crate::metrics::exporter::MetricsSink;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Ticks per rate window
pub const WINDOW_TICKS: u64 = 3;

/// Ticks between distribution resets (one hour)
pub const DISTRIBUTION_RESET_TICKS: u64 = 3600;

/// Rates published when a window closes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowRates {
    pub qps: u64,
    pub received_bytes_per_sec: u64,
    pub sent_bytes_per_sec: u64,
    pub period: u64,
}

/// What a single tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickOutcome {
    pub uptime: u64,
    /// Set when this tick closed a window and published rates
    pub window: Option<WindowRates>,
    /// Set when this tick was a boundary without a baseline and only seeded one
    pub seeded: bool,
    pub distribution_reset: bool,
}

pub struct RateSampler {
    state: Arc<MetricsState>,
    sink: Arc<dyn MetricsSink>,
}

impl RateSampler {
    pub fn new(state: Arc<MetricsState>, sink: Arc<dyn MetricsSink>) -> Self {
        Self { state, sink }
    }

    fn current_values(&self, uptime: u64) -> BaselineValues {
        BaselineValues {
            total_requests: self.state.total_requests(),
            uptime,
            received_bytes: self.state.received_bytes(),
            sent_bytes: self.state.sent_bytes(),
        }
    }

    /// Capture the current counters as the first window's baseline
    pub fn seed(&self) {
        let uptime = self.state.uptime_seconds();
        self.state.baseline().capture(self.current_values(uptime));
    }

    /// Run one sampling step
    pub fn tick(&self) -> TickOutcome {
        let uptime = self.state.tick_uptime();
        self.sink.tick_uptime();

        let mut outcome = TickOutcome {
            uptime,
            ..TickOutcome::default()
        };

        if uptime % WINDOW_TICKS == 0 {
            let current = self.current_values(uptime);
            let baseline = self.state.baseline();

            if baseline.is_seeded() {
                let rates = compute_rates(&baseline.load(), &current);
                self.state.store_rates(
                    rates.qps,
                    rates.received_bytes_per_sec,
                    rates.sent_bytes_per_sec,
                );
                self.sink.publish_rates(
                    rates.qps,
                    rates.received_bytes_per_sec,
                    rates.sent_bytes_per_sec,
                );
                tracing::trace!(
                    uptime,
                    qps = rates.qps,
                    received_bytes_per_sec = rates.received_bytes_per_sec,
                    sent_bytes_per_sec = rates.sent_bytes_per_sec,
                    "Rate window closed"
                );
                outcome.window = Some(rates);
            } else {
                tracing::debug!(uptime, "No rate baseline yet, seeding and skipping window");
                outcome.seeded = true;
            }

            baseline.capture(current);
        }

        if uptime % DISTRIBUTION_RESET_TICKS == 0 {
            tracing::debug!(uptime, "Resetting latency distribution");
            self.sink.reset_distribution();
            outcome.distribution_reset = true;
        }

        outcome
    }

    /// Spawn the ticking task on the current Tokio runtime
    ///
    /// The first tick fires one interval after the call. The task runs until
    /// the returned handle is stopped or dropped.
    pub fn spawn(self) -> SamplerHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let start = Instant::now() + TICK_INTERVAL;
            let mut interval = tokio::time::interval_at(start, TICK_INTERVAL);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            tracing::info!(
                interval_ms = TICK_INTERVAL.as_millis() as u64,
                window_ticks = WINDOW_TICKS,
                "Starting rate sampler"
            );

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        self.tick();
                    }
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            tracing::info!(
                uptime = self.state.uptime_seconds(),
                "Rate sampler stopped"
            );
        });

        SamplerHandle {
            stop: stop_tx,
            task: Some(task),
        }
    }
}

/// Rates for the window between `prev` and `current`
fn compute_rates(prev: &BaselineValues, current: &BaselineValues) -> WindowRates {
    let period = current.uptime.saturating_sub(prev.uptime).max(1);
    let diff_requests = current.total_requests.saturating_sub(prev.total_requests);
    let diff_received = current.received_bytes.saturating_sub(prev.received_bytes);
    let diff_sent = current.sent_bytes.saturating_sub(prev.sent_bytes);

    WindowRates {
        qps: diff_requests.div_ceil(WINDOW_TICKS),
        received_bytes_per_sec: diff_received.div_ceil(period),
        sent_bytes_per_sec: diff_sent.div_ceil(period),
        period,
    }
}

/// Stop signal and join handle for a spawned sampler
///
/// Dropping the handle signals the task to stop without waiting for it.
pub struct SamplerHandle {
    stop: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl SamplerHandle {
    /// Ask the task to stop after its current tick
    pub fn stop(&self) {
        // Receiver is gone only when the task already ended
        let _ = self.stop.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(|task| task.is_finished())
    }

    /// Stop the task and wait for it to exit
    pub async fn shutdown(mut self) {
        self.stop();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Rate sampler task panicked");
            }
        }
    }
}

impl Drop for SamplerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
