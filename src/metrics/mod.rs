//! In-process request metrics
//!
//! This module provides one [`Metrics`] facade per namespace, tracking:
//! - Total requests and request/response bytes (lock-free counters)
//! - Requests per second and bytes per second over a 3-second window
//! - Latency and size distributions in Prometheus histograms
//!
//! # Example
//!
//! ```no_run
//! use reqmeter::metrics::{Metrics, NamespaceRegistry};
//!
//! # async fn run() -> Result<(), reqmeter::error::MetricsError> {
//! let registry = NamespaceRegistry::new();
//! let metrics = Metrics::start("default", &registry)?;
//!
//! metrics.record_request(200, "/ping", "GET", 0.004, 120, 17);
//! println!("qps = {}", metrics.qps());
//! # Ok(())
//! # }
//! ```

pub mod counters;
pub mod exporter;
pub mod registry;
pub mod sampler;

pub use counters::{MetricsSnapshot, MetricsState};
pub use exporter::{MetricsSink, PrometheusExporter, RequestLabels};
pub use registry::NamespaceRegistry;
pub use sampler::{RateSampler, SamplerHandle, TickOutcome, WindowRates};

use crate::error::MetricsError;
use std::sync::{Arc, Mutex};

/// Metrics facade for one namespace
///
/// Cheap to clone; clones share the same counters and sampler.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<Inner>,
}

struct Inner {
    namespace: String,
    state: Arc<MetricsState>,
    sink: Arc<dyn MetricsSink>,
    sampler: Mutex<Option<SamplerHandle>>,
}

impl Metrics {
    /// Register `namespace` with Prometheus collectors, without starting the sampler
    ///
    /// Rates stay at zero until [`Metrics::start_sampler`] is called or the
    /// sampler is driven by hand through [`Metrics::sampler`].
    ///
    /// # Errors
    ///
    /// Returns a [`MetricsError`] if the namespace is invalid, already
    /// registered, or its collectors cannot be registered.
    pub fn new(namespace: &str, registry: &NamespaceRegistry) -> Result<Self, MetricsError> {
        registry.claim(namespace)?;

        let exporter = match PrometheusExporter::register(namespace, registry.prometheus()) {
            Ok(exporter) => exporter,
            Err(e) => {
                registry.release(namespace);
                return Err(e.into());
            }
        };

        tracing::info!(namespace, "Metrics namespace registered");
        Ok(Self::with_sink(namespace, Arc::new(exporter)))
    }

    /// Register `namespace` and spawn its rate sampler
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(namespace: &str, registry: &NamespaceRegistry) -> Result<Self, MetricsError> {
        let metrics = Self::new(namespace, registry)?;
        metrics.start_sampler();
        Ok(metrics)
    }

    /// Build a facade over an arbitrary backend
    ///
    /// No namespace claim takes place; uniqueness is the caller's concern.
    pub fn with_sink(namespace: &str, sink: Arc<dyn MetricsSink>) -> Self {
        Self {
            inner: Arc::new(Inner {
                namespace: namespace.to_string(),
                state: Arc::new(MetricsState::new()),
                sink,
                sampler: Mutex::new(None),
            }),
        }
    }

    /// A sampler over this facade's counters, for driving ticks manually
    pub fn sampler(&self) -> RateSampler {
        RateSampler::new(Arc::clone(&self.inner.state), Arc::clone(&self.inner.sink))
    }

    /// Seed the rate baseline and spawn the sampler task
    ///
    /// Does nothing if a sampler is already running.
    pub fn start_sampler(&self) {
        let Ok(mut slot) = self.inner.sampler.lock() else {
            tracing::error!(
                namespace = %self.inner.namespace,
                "Sampler slot lock poisoned, rate sampler not started"
            );
            return;
        };

        if slot.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }

        let sampler = self.sampler();
        sampler.seed();
        *slot = Some(sampler.spawn());
    }

    /// Stop the sampler task and wait for it to exit
    pub async fn shutdown(&self) {
        let handle = match self.inner.sampler.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        };

        if let Some(handle) = handle {
            handle.shutdown().await;
            tracing::info!(namespace = %self.inner.namespace, "Metrics sampler shut down");
        }
    }

    /// Record one completed request
    ///
    /// Negative sizes are clamped to zero; non-finite or negative durations
    /// are recorded as zero.
    pub fn record_request(
        &self,
        status: u16,
        path: &str,
        method: &str,
        duration_secs: f64,
        request_size: i64,
        response_size: i64,
    ) {
        let request_size = clamp_size(request_size);
        let response_size = clamp_size(response_size);
        let duration_secs = if duration_secs.is_finite() && duration_secs >= 0.0 {
            duration_secs
        } else {
            0.0
        };

        let state = &self.inner.state;
        state.increment_requests();
        state.add_received_bytes(request_size);
        state.add_sent_bytes(response_size);

        self.inner.sink.observe_request(
            &RequestLabels {
                status,
                path,
                method,
            },
            duration_secs,
            request_size,
            response_size,
        );
    }

    pub fn namespace(&self) -> &str {
        &self.inner.namespace
    }

    pub fn total_request(&self) -> u64 {
        self.inner.state.total_requests()
    }

    pub fn qps(&self) -> u64 {
        self.inner.state.qps()
    }

    pub fn uptime(&self) -> u64 {
        self.inner.state.uptime_seconds()
    }

    /// Request bytes received per second over the last window
    pub fn current_received_bytes(&self) -> u64 {
        self.inner.state.current_received_bytes_per_sec()
    }

    /// Response bytes sent per second over the last window
    pub fn current_sent_bytes(&self) -> u64 {
        self.inner.state.current_sent_bytes_per_sec()
    }

    pub fn received_bytes(&self) -> u64 {
        self.inner.state.received_bytes()
    }

    pub fn sent_bytes(&self) -> u64 {
        self.inner.state.sent_bytes()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.inner.state.snapshot()
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("namespace", &self.inner.namespace)
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

fn clamp_size(size: i64) -> u64 {
    u64::try_from(size).unwrap_or(0)
}
