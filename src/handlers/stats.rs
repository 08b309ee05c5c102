//! JSON stats endpoint
//!
//! Reports the cumulative counters and latest window rates of every namespace.

use axum::{Json, extract::State};
use serde::Serialize;

use crate::handlers::AppState;
use crate::metrics::MetricsSnapshot;

#[derive(Debug, Serialize)]
pub struct NamespaceStats {
    pub namespace: String,
    #[serde(flatten)]
    pub snapshot: MetricsSnapshot,
}

/// Stats handler
///
/// ```bash
/// curl http://localhost:8080/stats
/// [{"namespace":"default","total_request":12,"uptime":30,"qps":1,...}]
/// ```
pub async fn handler(State(state): State<AppState>) -> Json<Vec<NamespaceStats>> {
    let stats = state
        .all_metrics()
        .iter()
        .map(|m| NamespaceStats {
            namespace: m.namespace().to_string(),
            snapshot: m.snapshot(),
        })
        .collect();

    Json(stats)
}
