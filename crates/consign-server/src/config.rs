//! Configuration parsing for the Consign server.
//!
//! Supports:
//! - CLI arguments via clap
//! - Environment variable overrides
//! - Sensible defaults for quick start

use clap::Parser;
use std::num::NonZeroUsize;
use std::path::PathBuf;

use crate::shipping::batch::DEFAULT_BATCH_SIZE;
use crate::shipping::{BatchConfig, LookupFailurePolicy};

/// Consign: a gRPC order service that combines order streams into shipments.
#[derive(Parser, Debug, Clone)]
#[command(name = "consign")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Host address to bind to
    #[arg(long, env = "CONSIGN_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "CONSIGN_PORT", default_value_t = 50051)]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "CONSIGN_LOG_JSON")]
    pub log_json: bool,

    /// Orders per ProcessOrders batch before combined shipments are flushed
    #[arg(long, env = "CONSIGN_BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: NonZeroUsize,

    /// What a ProcessOrders session does with an unknown or malformed order ID
    #[arg(long, env = "CONSIGN_LOOKUP_FAILURE", value_enum, default_value_t = LookupFailurePolicy::Skip)]
    pub lookup_failure: LookupFailurePolicy,

    /// Shipments buffered per streaming call before the session waits on the caller
    #[arg(long, env = "CONSIGN_OUTBOUND_BUFFER", default_value_t = 32)]
    pub outbound_buffer: usize,

    /// JSON file of orders loaded into the store at startup
    #[arg(long, env = "CONSIGN_SEED_FILE")]
    pub seed_file: Option<PathBuf>,

    /// Start with an empty store instead of the built-in sample orders
    #[arg(long, env = "CONSIGN_NO_SAMPLE_DATA")]
    pub no_sample_data: bool,

    /// Serve Prometheus metrics over HTTP
    #[arg(long, env = "CONSIGN_METRICS_ENABLED")]
    pub metrics_enabled: bool,

    /// Port for the Prometheus metrics endpoint
    #[arg(long, env = "CONSIGN_METRICS_PORT", default_value_t = 9090)]
    pub metrics_port: u16,

    /// OpenTelemetry collector endpoint for span export (optional)
    #[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    pub otel_endpoint: Option<String>,
}

impl Config {
    /// Parse configuration from CLI arguments and environment.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Flush policy for ProcessOrders sessions.
    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig::from_config(self.batch_size)
    }

    /// Create a default configuration for testing.
    #[cfg(test)]
    pub fn test_config() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0, // Random port
            log_level: "debug".into(),
            outbound_buffer: 8,
            ..Self::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 50051,
            log_level: "info".into(),
            log_json: false,
            batch_size: DEFAULT_BATCH_SIZE,
            lookup_failure: LookupFailurePolicy::Skip,
            outbound_buffer: 32,
            seed_file: None,
            no_sample_data: false,
            metrics_enabled: false,
            metrics_port: 9090,
            otel_endpoint: None,
        }
    }
}
