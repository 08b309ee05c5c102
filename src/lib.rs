//! reqmeter - In-process request metrics for HTTP servers
//!
//! Counts requests and bytes with lock-free counters, derives requests/sec and
//! bytes/sec over a rolling 3-second window, and exports everything through a
//! Prometheus registry. The axum middleware in [`middleware`] feeds the
//! counters once per completed request.

pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod reporter;
pub mod telemetry;
