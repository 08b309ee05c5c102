//! Command-line interface for reqmeter
//!
//! Provides argument parsing and subcommand handling for the reqmeter binary.

use clap::{Parser, Subcommand};

/// HTTP server with in-process request metrics
#[derive(Parser)]
#[command(name = "reqmeter")]
#[command(version)]
#[command(about = "HTTP server with in-process request metrics")]
#[command(
    long_about = "reqmeter serves a small HTTP API instrumented with request counters, \
    rolling QPS and byte-rate gauges, and Prometheus latency histograms."
)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate a template configuration file
    Config {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },
}

/// Generate template configuration content
pub fn generate_config_template() -> &'static str {
    r#"# reqmeter Configuration
# ======================

# ─────────────────────────────────────────────────────────────────────────────
# SERVER CONFIGURATION
# ─────────────────────────────────────────────────────────────────────────────

[server]
# IP address to bind to (0.0.0.0 for all interfaces, 127.0.0.1 for localhost only)
host = "0.0.0.0"

# Port to listen on
port = 8080

# ─────────────────────────────────────────────────────────────────────────────
# METRICS
# ─────────────────────────────────────────────────────────────────────────────
#
# Each namespace gets its own counters, rate sampler and Prometheus series
# (reqmeter_<namespace>_*). The first namespace instruments the HTTP routes.
# Names may contain ASCII letters, digits and '_' and must not start with a digit.

[metrics]
namespaces = ["default"]

# How often to log total requests, QPS and byte rates (seconds)
stats_log_interval_seconds = 5

# ─────────────────────────────────────────────────────────────────────────────
# OBSERVABILITY
# ─────────────────────────────────────────────────────────────────────────────

[observability]
# Log level: "trace", "debug", "info", "warn", "error"
log_level = "info"

# Prometheus metrics are available at /metrics, JSON stats at /stats
"#
}
