//! Consign: a gRPC order service that combines order streams into shipments.
//!
//! # Usage
//!
//! ```bash
//! consign --port 50051 --batch-size 3 --log-level info
//! ```
//!
//! Environment variables can also be used:
//! - `CONSIGN_PORT`: Port to listen on
//! - `CONSIGN_BATCH_SIZE`: Orders per ProcessOrders batch
//! - `CONSIGN_SEED_FILE`: JSON file of orders to load at startup
//! - `RUST_LOG`: Log level (trace, debug, info, warn, error)

use anyhow::Context;
use consign_server::config::Config;
use consign_server::observability::metrics::init_metrics;
use consign_server::observability::tracing::{init_tracing, shutdown_tracing};
use consign_server::server::run_server;
use tokio::sync::watch;

/// Print startup banner with version and configuration.
fn print_banner(config: &Config) {
    let version = env!("CARGO_PKG_VERSION");
    let seed = config
        .seed_file
        .as_ref()
        .map_or_else(|| "none".to_string(), |p| p.display().to_string());
    let metrics = if config.metrics_enabled {
        format!("{}:{}", config.host, config.metrics_port)
    } else {
        "disabled".to_string()
    };

    eprintln!(
        r#"
    ____                _
   / ___|___  _ __  ___(_) __ _ _ __
  | |   / _ \| '_ \/ __| |/ _` | '_ \
  | |__| (_) | | | \__ \ | (_| | | | |
   \____\___/|_| |_|___/_|\__, |_| |_|
                          |___/
  Consign v{version} - gRPC Order Service

  Configuration:
    Address:     {}:{}
    Batch Size:  {}
    On Unknown:  {:?}
    Seed File:   {seed}
    Metrics:     {metrics}
    Log Level:   {}

  Press Ctrl+C to shutdown gracefully.
"#,
        config.host, config.port, config.batch_size, config.lookup_failure, config.log_level
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse configuration from CLI arguments and environment
    let config = Config::parse_args();

    // Initialize tracing/logging (with optional OTLP export)
    init_tracing(
        &config.log_level,
        config.log_json,
        config.otel_endpoint.as_deref(),
    );

    init_metrics().context("failed to register metrics")?;

    print_banner(&config);

    // Create shutdown signal channel
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Spawn signal handler task
    tokio::spawn(async move {
        wait_for_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let result = run_server(config, shutdown_rx)
        .await
        .context("server terminated with an error");

    shutdown_tracing();
    result?;

    tracing::info!("Consign shutdown complete");
    Ok(())
}

/// Wait for SIGTERM or SIGINT (Ctrl+C).
async fn wait_for_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {
                        tracing::info!("Received SIGINT (Ctrl+C), initiating shutdown...");
                    }
                    _ = sigterm.recv() => {
                        tracing::info!("Received SIGTERM, initiating shutdown...");
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler, only Ctrl+C will stop the server");
                let _ = ctrl_c.await;
                tracing::info!("Received SIGINT (Ctrl+C), initiating shutdown...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = ctrl_c.await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        tracing::info!("Received Ctrl+C, initiating shutdown...");
    }
}
