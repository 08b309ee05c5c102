//! HTTP request handlers for the reqmeter API

use crate::config::Config;
use crate::error::AppResult;
use crate::metrics::{Metrics, NamespaceRegistry};
use crate::middleware::record_metrics;
use axum::{Router, middleware, routing::get};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod metrics;
pub mod ping;
pub mod stats;

/// Application state shared across all handlers
///
/// Holds the namespace registry and one metrics facade per configured
/// namespace. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    registry: NamespaceRegistry,
    metrics: Arc<Vec<Metrics>>,
}

impl AppState {
    /// Register every configured namespace and start its rate sampler
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Fails on the first namespace that cannot be registered; nothing is
    /// partially started in that case.
    pub fn new(config: &Config) -> AppResult<Self> {
        let registry = NamespaceRegistry::new();

        let metrics = config
            .metrics
            .namespaces()
            .iter()
            .map(|namespace| Metrics::new(namespace, &registry))
            .collect::<Result<Vec<_>, _>>()?;

        for m in &metrics {
            m.start_sampler();
        }

        Ok(Self {
            registry,
            metrics: Arc::new(metrics),
        })
    }

    pub fn registry(&self) -> &NamespaceRegistry {
        &self.registry
    }

    /// The facade that instruments HTTP routes
    pub fn primary(&self) -> Option<&Metrics> {
        self.metrics.first()
    }

    pub fn all_metrics(&self) -> &[Metrics] {
        &self.metrics
    }

    /// Look up a facade by namespace
    pub fn metrics_for(&self, namespace: &str) -> Option<&Metrics> {
        self.metrics.iter().find(|m| m.namespace() == namespace)
    }

    /// Stop every rate sampler
    pub async fn shutdown(&self) {
        for m in self.metrics.iter() {
            m.shutdown().await;
        }
    }
}

/// Build the HTTP router with request metrics on every route
pub fn router(state: AppState) -> Router {
    let primary = state.primary().cloned();

    Router::new()
        .route("/ping", get(ping::handler))
        .route("/metrics", get(metrics::handler))
        .route("/stats", get(stats::handler))
        .with_state(state)
        .layer(middleware::from_fn_with_state(primary, record_metrics))
        .layer(TraceLayer::new_for_http())
}
