//! Lock-free counter set for one metrics namespace
//!
//! Request contexts mutate the cumulative counters concurrently; the rate
//! sampler is the only writer of the derived rates and the snapshot baselines.
//! Every field is an individual atomic. Reads across different fields are not
//! a joint snapshot, so readers must tolerate skew between them.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Counters, derived rates and rate baselines for a single namespace
#[derive(Debug, Default)]
pub struct MetricsState {
    total_requests: AtomicU64,
    uptime_seconds: AtomicU64,
    received_bytes: AtomicU64,
    sent_bytes: AtomicU64,

    qps: AtomicU64,
    current_received_bytes_per_sec: AtomicU64,
    current_sent_bytes_per_sec: AtomicU64,

    baseline: Baseline,
}

/// Counter values captured at the start of the current window
///
/// Owned by the rate sampler. `seeded` is false until the first capture.
#[derive(Debug, Default)]
pub(crate) struct Baseline {
    seeded: AtomicBool,
    total_requests: AtomicU64,
    uptime: AtomicU64,
    received_bytes: AtomicU64,
    sent_bytes: AtomicU64,
}

/// Plain copy of every value in a [`MetricsState`]
///
/// Fields are loaded one at a time, so a snapshot taken while requests are in
/// flight may mix values from slightly different instants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub total_request: u64,
    pub uptime: u64,
    pub received_bytes: u64,
    pub sent_bytes: u64,
    pub qps: u64,
    pub current_received_bytes: u64,
    pub current_sent_bytes: u64,
}

impl MetricsState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_requests(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_received_bytes(&self, n: u64) {
        self.received_bytes.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_sent_bytes(&self, n: u64) {
        self.sent_bytes.fetch_add(n, Ordering::Relaxed);
    }

    /// Advance uptime by one tick, returning the new value
    pub(crate) fn tick_uptime(&self) -> u64 {
        self.uptime_seconds.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.uptime_seconds.load(Ordering::Relaxed)
    }

    pub fn received_bytes(&self) -> u64 {
        self.received_bytes.load(Ordering::Relaxed)
    }

    pub fn sent_bytes(&self) -> u64 {
        self.sent_bytes.load(Ordering::Relaxed)
    }

    pub fn qps(&self) -> u64 {
        self.qps.load(Ordering::Relaxed)
    }

    pub fn current_received_bytes_per_sec(&self) -> u64 {
        self.current_received_bytes_per_sec.load(Ordering::Relaxed)
    }

    pub fn current_sent_bytes_per_sec(&self) -> u64 {
        self.current_sent_bytes_per_sec.load(Ordering::Relaxed)
    }

    /// Overwrite all derived rates at a window boundary
    pub(crate) fn store_rates(&self, qps: u64, received_per_sec: u64, sent_per_sec: u64) {
        self.qps.store(qps, Ordering::Relaxed);
        self.current_received_bytes_per_sec
            .store(received_per_sec, Ordering::Relaxed);
        self.current_sent_bytes_per_sec
            .store(sent_per_sec, Ordering::Relaxed);
    }

    pub(crate) fn baseline(&self) -> &Baseline {
        &self.baseline
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_request: self.total_requests(),
            uptime: self.uptime_seconds(),
            received_bytes: self.received_bytes(),
            sent_bytes: self.sent_bytes(),
            qps: self.qps(),
            current_received_bytes: self.current_received_bytes_per_sec(),
            current_sent_bytes: self.current_sent_bytes_per_sec(),
        }
    }
}

/// Baseline values as read by the sampler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BaselineValues {
    pub total_requests: u64,
    pub uptime: u64,
    pub received_bytes: u64,
    pub sent_bytes: u64,
}

impl Baseline {
    pub(crate) fn is_seeded(&self) -> bool {
        self.seeded.load(Ordering::Acquire)
    }

    pub(crate) fn load(&self) -> BaselineValues {
        BaselineValues {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            uptime: self.uptime.load(Ordering::Relaxed),
            received_bytes: self.received_bytes.load(Ordering::Relaxed),
            sent_bytes: self.sent_bytes.load(Ordering::Relaxed),
        }
    }

    /// Capture the current cumulative values as the new window start
    pub(crate) fn capture(&self, values: BaselineValues) {
        self.total_requests
            .store(values.total_requests, Ordering::Relaxed);
        self.uptime.store(values.uptime, Ordering::Relaxed);
        self.received_bytes
            .store(values.received_bytes, Ordering::Relaxed);
        self.sent_bytes.store(values.sent_bytes, Ordering::Relaxed);
        self.seeded.store(true, Ordering::Release);
    }
}
