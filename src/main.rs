//! reqmeter HTTP server
//!
//! Starts an Axum web server whose routes are instrumented with request metrics.

use clap::Parser;
use reqmeter::{
    cli::{Cli, Command, generate_config_template},
    config::Config,
    handlers::{self, AppState},
    reporter, telemetry,
};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(Command::Config { output }) = cli.command {
        match output {
            Some(path) => {
                std::fs::write(&path, generate_config_template())?;
                println!("Configuration template written to {}", path);
            }
            None => print!("{}", generate_config_template()),
        }
        return Ok(());
    }

    let config = Config::from_file(&cli.config)?;

    telemetry::init(&config.observability.log_level);

    tracing::info!(
        "Starting reqmeter server on {}:{}",
        config.server.host,
        config.server.port
    );

    let state = AppState::new(&config)?;

    let stats_logger = reporter::start_stats_logger(
        state.all_metrics().to_vec(),
        Duration::from_secs(config.metrics.stats_log_interval_seconds()),
    );

    let app = handlers::router(state.clone());

    // Config::validate has already checked the host
    let host: IpAddr = config.server.host.parse()?;
    let addr = SocketAddr::from((host, config.server.port));

    tracing::info!("Listening on {}", addr);
    tracing::info!("Prometheus metrics available at http://{}/metrics", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    stats_logger.abort();
    state.shutdown().await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
