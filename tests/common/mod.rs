//! Shared helpers for integration tests

#![allow(dead_code)]

use reqmeter::metrics::{Metrics, MetricsSink, RequestLabels};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Sink that remembers every outbound call instead of exporting it
#[derive(Default)]
pub struct RecordingSink {
    pub observed: AtomicU64,
    pub uptime_ticks: AtomicU64,
    pub resets: AtomicU64,
    pub published: Mutex<Vec<(u64, u64, u64)>>,
    pub labels: Mutex<Vec<(u16, String, String)>>,
    pub responses: Mutex<Vec<(f64, u64)>>,
}

impl MetricsSink for RecordingSink {
    fn observe_request(
        &self,
        labels: &RequestLabels<'_>,
        duration_secs: f64,
        _request_size: u64,
        response_size: u64,
    ) {
        self.observed.fetch_add(1, Ordering::Relaxed);
        self.labels.lock().expect("labels lock").push((
            labels.status,
            labels.path.to_string(),
            labels.method.to_string(),
        ));
        self.responses
            .lock()
            .expect("responses lock")
            .push((duration_secs, response_size));
    }

    fn tick_uptime(&self) {
        self.uptime_ticks.fetch_add(1, Ordering::Relaxed);
    }

    fn publish_rates(&self, qps: u64, received_bytes_per_sec: u64, sent_bytes_per_sec: u64) {
        self.published.lock().expect("published lock").push((
            qps,
            received_bytes_per_sec,
            sent_bytes_per_sec,
        ));
    }

    fn reset_distribution(&self) {
        self.resets.fetch_add(1, Ordering::Relaxed);
    }
}

/// Facade backed by a fresh [`RecordingSink`]
pub fn recording_metrics(namespace: &str) -> (Metrics, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let metrics = Metrics::with_sink(namespace, sink.clone());
    (metrics, sink)
}
