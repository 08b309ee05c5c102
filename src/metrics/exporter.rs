//! Prometheus backend for request metrics
//!
//! Every namespace gets its own set of collectors, prefixed with
//! `reqmeter_<namespace>_`. Per-request series are labelled
//! `(status, path, method)`.
//!
//! The sampler and the facade talk to the backend through [`MetricsSink`], so
//! tests can substitute a recording sink for the Prometheus one.

use prometheus::core::Collector;
use prometheus::{
    CounterVec, HistogramOpts, HistogramVec, IntCounter, IntGauge, Opts, Registry,
    exponential_buckets,
};

/// Latency buckets in seconds
pub const DURATION_BUCKETS: [f64; 8] = [0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 999.0];

const LABELS: [&str; 3] = ["status", "path", "method"];

/// Label tuple attached to every per-request series
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLabels<'a> {
    pub status: u16,
    pub path: &'a str,
    pub method: &'a str,
}

/// Outbound calls from the aggregator to a metrics backend
pub trait MetricsSink: Send + Sync {
    /// Record one completed request. Sizes are already clamped to non-negative.
    fn observe_request(
        &self,
        labels: &RequestLabels<'_>,
        duration_secs: f64,
        request_size: u64,
        response_size: u64,
    );

    /// One sampler tick elapsed
    fn tick_uptime(&self);

    /// Publish the rates computed at a window boundary
    fn publish_rates(&self, qps: u64, received_bytes_per_sec: u64, sent_bytes_per_sec: u64);

    /// Drop accumulated distribution state to bound label cardinality
    fn reset_distribution(&self);
}

/// Collectors for one namespace, registered on a shared Prometheus registry
#[derive(Clone)]
pub struct PrometheusExporter {
    total_request: CounterVec,
    uptime: IntCounter,
    qps: IntGauge,
    received_bytes_per_second: IntGauge,
    sent_bytes_per_second: IntGauge,
    duration: HistogramVec,
    request_size: HistogramVec,
    response_size: HistogramVec,
}

impl PrometheusExporter {
    /// Build and register every collector for `namespace`
    ///
    /// # Errors
    ///
    /// Returns an error if a metric name is invalid or a collector with the
    /// same name is already registered.
    pub fn register(namespace: &str, registry: &Registry) -> Result<Self, prometheus::Error> {
        let prefix = format!("reqmeter_{namespace}");

        let total_request = CounterVec::new(
            Opts::new("total_request", "Total number of http requests made.")
                .namespace(prefix.clone()),
            &LABELS,
        )?;

        let uptime = IntCounter::with_opts(
            Opts::new("uptime", "Service uptime in seconds.").namespace(prefix.clone()),
        )?;

        // Gauges below are overwritten every 3 seconds by the rate sampler
        let qps = IntGauge::with_opts(
            Opts::new("request_per_second", "Requests per second.").namespace(prefix.clone()),
        )?;

        let received_bytes_per_second = IntGauge::with_opts(
            Opts::new(
                "received_bytes_per_second",
                "Approximate request bytes received per second.",
            )
            .namespace(prefix.clone()),
        )?;

        let sent_bytes_per_second = IntGauge::with_opts(
            Opts::new("sent_bytes_per_second", "Response bytes sent per second.")
                .namespace(prefix.clone()),
        )?;

        let duration = HistogramVec::new(
            HistogramOpts::new("requests_duration_seconds", "Request latencies in seconds.")
                .namespace(prefix.clone())
                .buckets(DURATION_BUCKETS.to_vec()),
            &LABELS,
        )?;

        // 64 B .. 1 MiB
        let size_buckets = exponential_buckets(64.0, 4.0, 8)?;

        let request_size = HistogramVec::new(
            HistogramOpts::new("request_size_bytes", "HTTP request sizes in bytes.")
                .namespace(prefix.clone())
                .buckets(size_buckets.clone()),
            &LABELS,
        )?;

        let response_size = HistogramVec::new(
            HistogramOpts::new("response_size_bytes", "HTTP response sizes in bytes.")
                .namespace(prefix)
                .buckets(size_buckets),
            &LABELS,
        )?;

        let exporter = Self {
            total_request,
            uptime,
            qps,
            received_bytes_per_second,
            sent_bytes_per_second,
            duration,
            request_size,
            response_size,
        };

        for (index, collector) in exporter.collectors().into_iter().enumerate() {
            if let Err(e) = registry.register(collector) {
                // Roll back so the names can be registered again later
                for registered in exporter.collectors().into_iter().take(index) {
                    let _ = registry.unregister(registered);
                }
                return Err(e);
            }
        }

        Ok(exporter)
    }

    fn collectors(&self) -> Vec<Box<dyn Collector>> {
        vec![
            Box::new(self.total_request.clone()),
            Box::new(self.uptime.clone()),
            Box::new(self.qps.clone()),
            Box::new(self.received_bytes_per_second.clone()),
            Box::new(self.sent_bytes_per_second.clone()),
            Box::new(self.duration.clone()),
            Box::new(self.request_size.clone()),
            Box::new(self.response_size.clone()),
        ]
    }
}

/// Saturating u64 → i64 for gauge values
fn gauge_value(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

impl MetricsSink for PrometheusExporter {
    fn observe_request(
        &self,
        labels: &RequestLabels<'_>,
        duration_secs: f64,
        request_size: u64,
        response_size: u64,
    ) {
        let status = labels.status.to_string();
        let values = [status.as_str(), labels.path, labels.method];

        let result = self
            .total_request
            .get_metric_with_label_values(&values)
            .map(|c| c.inc())
            .and_then(|_| self.duration.get_metric_with_label_values(&values))
            .map(|h| h.observe(duration_secs))
            .and_then(|_| self.request_size.get_metric_with_label_values(&values))
            .map(|h| h.observe(request_size as f64))
            .and_then(|_| self.response_size.get_metric_with_label_values(&values))
            .map(|h| h.observe(response_size as f64));

        if let Err(e) = result {
            tracing::warn!(
                error = %e,
                status = labels.status,
                path = labels.path,
                method = labels.method,
                "Failed to record request in Prometheus backend"
            );
        }
    }

    fn tick_uptime(&self) {
        self.uptime.inc();
    }

    fn publish_rates(&self, qps: u64, received_bytes_per_sec: u64, sent_bytes_per_sec: u64) {
        self.qps.set(gauge_value(qps));
        self.received_bytes_per_second
            .set(gauge_value(received_bytes_per_sec));
        self.sent_bytes_per_second
            .set(gauge_value(sent_bytes_per_sec));
    }

    fn reset_distribution(&self) {
        self.duration.reset();
        self.request_size.reset();
        self.response_size.reset();
    }
}
