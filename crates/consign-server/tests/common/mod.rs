//! Test utilities and server harness for Consign integration tests.
//!
//! Provides:
//! - In-process test server on a random local port
//! - gRPC client helpers
//! - Shipment comparison helpers

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use consign_client::{ConnectConfig, ConsignClient};
use consign_server::config::Config;
use consign_server::proto::consign::v1::order_management_client::OrderManagementClient;
use consign_server::proto::consign::v1::CombinedShipment;
use consign_server::server::{build_store, serve_with_listener, ServerError, ServerState};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tonic::transport::Channel;

/// How long tests wait for a message the server should send.
pub const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// A running server bound to `127.0.0.1` on a random port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub state: Arc<ServerState>,
    shutdown_tx: oneshot::Sender<()>,
    handle: JoinHandle<Result<(), ServerError>>,
}

impl TestServer {
    /// Start a server over the sample orders with default settings.
    pub async fn start() -> Self {
        Self::start_with(Config::default()).await
    }

    /// Start a server with the given configuration; host and port are ignored.
    pub async fn start_with(config: Config) -> Self {
        consign_server::observability::tracing::init_test_tracing();

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind test listener");
        let addr = listener.local_addr().expect("listener has no address");

        let store = build_store(&config).expect("failed to build store");
        let state = Arc::new(ServerState::new(store, &config));

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(serve_with_listener(listener, Arc::clone(&state), async {
            let _ = shutdown_rx.await;
        }));

        Self {
            addr,
            state,
            shutdown_tx,
            handle,
        }
    }

    /// Server URL for clients.
    pub fn endpoint(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Connect a raw generated client.
    pub async fn client(&self) -> OrderManagementClient<Channel> {
        OrderManagementClient::connect(self.endpoint())
            .await
            .expect("failed to connect to test server")
    }

    /// Connect through the client library.
    pub async fn consign_client(&self) -> ConsignClient {
        ConsignClient::connect(&ConnectConfig::new(self.endpoint()))
            .await
            .expect("failed to connect to test server")
    }

    /// Stop the server and wait for it to exit cleanly.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        tokio::time::timeout(RECV_TIMEOUT, self.handle)
            .await
            .expect("server did not stop in time")
            .expect("server task panicked")
            .expect("server returned an error");
    }
}

/// Order IDs carried by a shipment, in shipment order.
pub fn order_ids(shipment: &CombinedShipment) -> Vec<&str> {
    shipment.order_list.iter().map(|o| o.id.as_str()).collect()
}

/// Shipments sorted by ID, since flush order across destinations is unspecified.
pub fn sorted(mut shipments: Vec<CombinedShipment>) -> Vec<CombinedShipment> {
    shipments.sort_by(|a, b| a.id.cmp(&b.id));
    shipments
}
