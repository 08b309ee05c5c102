//! Liveness endpoint

use axum::Json;
use serde_json::{Value, json};

/// Always answers `{"message": "ok"}`
pub async fn handler() -> Json<Value> {
    Json(json!({ "message": "ok" }))
}
