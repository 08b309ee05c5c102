//! Integration tests for configuration loading
//!
//! Covers the full path: file → parse → validate, including the error
//! context attached to each phase.

use reqmeter::config::Config;
use reqmeter::error::AppError;
use std::io::Write;
use tempfile::NamedTempFile;

/// Helper to create a temporary config file with given TOML content
fn create_temp_config(toml_content: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    temp_file
        .write_all(toml_content.as_bytes())
        .expect("Failed to write temp file");
    temp_file.flush().expect("Failed to flush temp file");
    temp_file
}

#[test]
fn test_config_from_file_loads_valid_config() {
    let temp_file = create_temp_config(
        r#"
[server]
host = "127.0.0.1"
port = 9000

[metrics]
namespaces = ["api", "jobs"]
"#,
    );

    let config = Config::from_file(temp_file.path()).expect("valid config");
    assert_eq!(config.server.port, 9000);
    assert_eq!(config.metrics.namespaces(), ["api".to_string(), "jobs".to_string()]);
}

#[test]
fn test_config_from_file_missing_file_reports_path() {
    let err = Config::from_file("/nonexistent/reqmeter.toml").unwrap_err();
    assert!(matches!(err, AppError::ConfigFileRead { .. }));
    assert!(err.to_string().contains("/nonexistent/reqmeter.toml"));
}

#[test]
fn test_config_from_file_rejects_malformed_toml() {
    let temp_file = create_temp_config("[server\nport = ");
    let err = Config::from_file(temp_file.path()).unwrap_err();
    assert!(matches!(err, AppError::ConfigParseFailed { .. }));
}

#[test]
fn test_config_from_file_rejects_duplicate_namespaces() {
    let temp_file = create_temp_config(
        r#"
[server]

[metrics]
namespaces = ["api", "api"]
"#,
    );

    let err = Config::from_file(temp_file.path()).unwrap_err();
    assert!(matches!(err, AppError::ConfigValidationFailed { .. }));
    assert!(
        err.to_string().contains("api"),
        "Error message should name the duplicate namespace, got: {}",
        err
    );
}

#[test]
fn test_config_from_file_rejects_hostname_typo() {
    let temp_file = create_temp_config(
        r#"
[server]
host = "127.0.0.l"
port = 8080
"#,
    );

    let err = Config::from_file(temp_file.path()).unwrap_err();
    assert!(matches!(err, AppError::ConfigValidationFailed { .. }));
    assert!(
        err.to_string().contains("127.0.0.l"),
        "Error message should name the bad host, got: {}",
        err
    );
}
