//! gRPC server setup and lifecycle.
//!
//! Configures tonic server with:
//! - The OrderManagement service handlers
//! - Store seeding from sample data and an optional seed file
//! - Graceful shutdown that also ends live ProcessOrders sessions

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;

use crate::config::Config;
use crate::observability::metrics::prometheus_registry;
use crate::observability::prometheus::{serve_ops_endpoint, OpsState};
use crate::proto::consign::v1::order_management_server::OrderManagementServer;
use crate::service::{OrderManagementService, SessionRegistry};
use crate::shipping::{BatchConfig, LookupFailurePolicy};
use crate::store::seed::{load_seed_file, sample_orders, SeedError};
use crate::store::{OrderStore, StoreError};

/// Error type for server startup and serving.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid listen address: {0}")]
    Address(#[from] std::net::AddrParseError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error(transparent)]
    Seed(#[from] SeedError),

    #[error("invalid seed order: {0}")]
    Store(#[from] StoreError),

    #[error("gRPC transport error: {0}")]
    Transport(#[from] tonic::transport::Error),
}

/// Server state shared across handlers.
#[derive(Debug)]
pub struct ServerState {
    pub store: OrderStore,
    pub batch: BatchConfig,
    pub lookup_policy: LookupFailurePolicy,
    pub outbound_buffer: usize,
    pub sessions: SessionRegistry,
}

impl ServerState {
    /// Build handler state around an existing store.
    pub fn new(store: OrderStore, config: &Config) -> Self {
        Self {
            store,
            batch: config.batch_config(),
            lookup_policy: config.lookup_failure,
            outbound_buffer: config.outbound_buffer,
            sessions: SessionRegistry::new(),
        }
    }
}

/// Build the order store described by the configuration.
///
/// Sample orders go in first, then the seed file, so a seed order replaces a
/// sample order with the same ID.
pub fn build_store(config: &Config) -> Result<OrderStore, ServerError> {
    let store = OrderStore::new();

    if !config.no_sample_data {
        for order in sample_orders() {
            store.upsert(order)?;
        }
    }

    if let Some(path) = &config.seed_file {
        let orders = load_seed_file(path)?;
        tracing::info!(path = %path.display(), count = orders.len(), "Loading seed orders");
        for order in orders {
            store.upsert(order)?;
        }
    }

    tracing::info!(orders = store.len(), "Order store ready");
    Ok(store)
}

/// Run the Consign gRPC server.
///
/// # Arguments
///
/// * `config` - Server configuration
/// * `shutdown_rx` - Receiver for shutdown signal
///
/// # Returns
///
/// Returns when the server has shut down.
pub async fn run_server(
    config: Config,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<(), ServerError> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    let store = build_store(&config)?;
    let state = Arc::new(ServerState::new(store, &config));

    // Metrics and readiness over plain HTTP
    if config.metrics_enabled {
        let metrics_addr: SocketAddr = format!("{}:{}", config.host, config.metrics_port).parse()?;
        let ops = OpsState::new(prometheus_registry(), state.clone());
        let metrics_shutdown_rx = shutdown_rx.clone();

        tokio::spawn(async move {
            if let Err(e) = serve_ops_endpoint(metrics_addr, ops, metrics_shutdown_rx).await {
                tracing::error!(error = %e, "Metrics endpoint failed");
            }
        });
    }

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;

    tracing::info!(
        address = %addr,
        batch_size = state.batch.batch_size.get(),
        lookup_failure = ?state.lookup_policy,
        "Starting Consign gRPC server"
    );

    serve_with_listener(listener, state, async move {
        let _ = shutdown_rx.changed().await;
        tracing::info!("Shutdown signal received, stopping server");
    })
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Serve the gRPC API on an already-bound listener until `shutdown` resolves.
///
/// On shutdown every live ProcessOrders session is cancelled, so streaming
/// callers see `UNAVAILABLE` instead of holding the server open.
pub async fn serve_with_listener<F>(
    listener: TcpListener,
    state: Arc<ServerState>,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send,
{
    let sessions = state.sessions.clone();
    let service = OrderManagementService::new(state);

    Server::builder()
        .add_service(OrderManagementServer::new(service))
        .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async move {
            shutdown.await;
            sessions.cancel_all();
        })
        .await?;

    Ok(())
}

/// Shared state over the sample orders, for handler tests.
#[cfg(test)]
pub(crate) fn test_state() -> Arc<ServerState> {
    let store = OrderStore::with_orders(sample_orders()).unwrap();
    Arc::new(ServerState::new(store, &Config::test_config()))
}
