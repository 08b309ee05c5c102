//! Prometheus metrics endpoint
//!
//! Exposes every registered namespace in Prometheus text format for scraping.

use axum::extract::State;

use crate::error::{AppError, AppResult};
use crate::handlers::AppState;

/// Metrics handler for Prometheus scraping
///
/// # Response
///
/// - `200 OK` with metrics in Prometheus text format
/// - `500 Internal Server Error` if metrics collection fails
///
/// # Example
///
/// ```bash
/// curl http://localhost:8080/metrics
/// # HELP reqmeter_default_total_request Total number of http requests made.
/// # TYPE reqmeter_default_total_request counter
/// reqmeter_default_total_request{method="GET",path="/ping",status="200"} 42
/// ```
pub async fn handler(State(state): State<AppState>) -> AppResult<String> {
    state.registry().gather().map_err(|e| {
        tracing::error!(
            error = %e,
            "Failed to gather metrics for Prometheus scraping"
        );
        AppError::Internal(format!("Failed to gather metrics: {}", e))
    })
}
