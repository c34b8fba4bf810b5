//! consignctl: Command-line interface for the Consign order service.
//!
//! Provides commands for looking up, adding, searching, and bulk-updating
//! orders, and for streaming order IDs through ProcessOrders to watch
//! combined shipments come back.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use consign_client::ConnectConfig;
use std::path::PathBuf;

/// Command-line interface for the Consign order service.
#[derive(Parser, Debug)]
#[command(name = "consignctl")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Consign server endpoint (e.g., http://localhost:50051)
    #[arg(short, long, env = "CONSIGN_ENDPOINT", default_value = "http://localhost:50051")]
    endpoint: String,

    /// Path to TLS CA certificate (required for https:// endpoints)
    #[arg(long, env = "CONSIGN_TLS_CA")]
    tls_ca: Option<PathBuf>,

    /// TLS domain name override
    #[arg(long, env = "CONSIGN_TLS_DOMAIN")]
    tls_domain: Option<String>,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("unknown output format: {s}")),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show one order
    Get {
        /// Order ID
        id: String,
    },
    /// Add an order under a server-assigned ID
    Add {
        /// Delivery destination
        #[arg(short, long)]
        destination: String,
        /// Order total
        #[arg(short, long, default_value_t = 0.0)]
        price: f64,
        /// Line item (repeat for several)
        #[arg(short, long = "item", required = true)]
        items: Vec<String>,
    },
    /// List orders with an item containing the query
    Search {
        /// Item substring to match
        query: String,
    },
    /// Replace orders from a JSON file (array of orders)
    Update {
        /// Path to the JSON file
        file: PathBuf,
    },
    /// Stream order IDs through ProcessOrders and print combined shipments
    Process {
        /// Order IDs, sent in the given order
        #[arg(required = true)]
        ids: Vec<String>,
        /// Pause between sends, in milliseconds
        #[arg(long, default_value_t = 0)]
        interval_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing for debug output
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Build connection config
    let config = ConnectConfig {
        endpoint: cli.endpoint,
        tls_ca: cli.tls_ca,
        tls_domain: cli.tls_domain,
    };

    match cli.command {
        Commands::Get { id } => commands::get::run(&config, &id, cli.output).await?,
        Commands::Add {
            destination,
            price,
            items,
        } => commands::add::run(&config, destination, price, items, cli.output).await?,
        Commands::Search { query } => commands::search::run(&config, &query, cli.output).await?,
        Commands::Update { file } => commands::update::run(&config, &file, cli.output).await?,
        Commands::Process { ids, interval_ms } => {
            commands::process::run(&config, ids, interval_ms, cli.output).await?;
        }
    }

    Ok(())
}
