//! Error types for reqmeter
//!
//! `MetricsError` covers metrics setup (all fatal configuration errors).
//! `AppError` covers the HTTP server and implements `IntoResponse` for Axum handlers.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Errors raised while constructing a metrics namespace
///
/// Every variant is a configuration error: it is returned synchronously from
/// construction and the caller is expected to abort setup.
#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("Metrics namespace '{namespace}' is already registered")]
    DuplicateNamespace { namespace: String },

    #[error("Invalid metrics namespace '{namespace}': {reason}")]
    InvalidNamespace { namespace: String, reason: String },

    #[error("Failed to register Prometheus collector: {0}")]
    Registration(#[from] prometheus::Error),

    #[error("Namespace registry lock poisoned by a panicking thread")]
    RegistryPoisoned,
}

/// Main error type for the application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read config file {path}: {source}")]
    ConfigFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration in {path}: {reason}")]
    ConfigValidationFailed { path: String, reason: String },

    #[error("Metrics setup failed: {0}")]
    Metrics(#[from] MetricsError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // All variants are server-side failures
        let status = StatusCode::INTERNAL_SERVER_ERROR;

        let body = Json(serde_json::json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

/// Convenience type alias for Results
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_creates() {
        let err = AppError::Config("test error".to_string());
        assert_eq!(err.to_string(), "Configuration error: test error");
    }

    #[test]
    fn test_internal_error_creates() {
        let err = AppError::Internal("unexpected state".to_string());
        assert_eq!(err.to_string(), "Internal error: unexpected state");
    }

    #[test]
    fn test_duplicate_namespace_message_names_namespace() {
        let err = MetricsError::DuplicateNamespace {
            namespace: "api".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Metrics namespace 'api' is already registered"
        );
    }

    #[test]
    fn test_metrics_error_converts_into_app_error() {
        let err: AppError = MetricsError::RegistryPoisoned.into();
        assert!(matches!(err, AppError::Metrics(MetricsError::RegistryPoisoned)));
        assert!(err.to_string().starts_with("Metrics setup failed"));
    }

    #[test]
    fn test_config_error_response_status() {
        let err = AppError::Config("test".to_string());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_internal_error_response_carries_json_message() {
        let err = AppError::Internal("Failed to gather metrics: boom".to_string());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let json: serde_json::Value = serde_json::from_slice(&bytes).expect("JSON body");
        assert_eq!(json["error"], "Internal error: Failed to gather metrics: boom");
    }
}
