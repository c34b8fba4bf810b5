//! Client library for the Consign order service.
//!
//! Used by the `consignctl` CLI and by the server's integration tests.
//!
//! ```no_run
//! # async fn demo() -> anyhow::Result<()> {
//! use consign_client::{ConnectConfig, ConsignClient};
//!
//! let mut client = ConsignClient::connect(&ConnectConfig::new("http://localhost:50051")).await?;
//! let mut session = client.process_orders().await?;
//! session.send("102").await?;
//! session.send("104").await?;
//! session.close_send();
//! while let Some(shipment) = session.next_shipment().await? {
//!     println!("{}: {} orders", shipment.id, shipment.order_list.len());
//! }
//! # Ok(())
//! # }
//! ```

mod connection;
mod ops;
mod shipments;

pub use connection::{ConnectConfig, ConnectError, ConsignClient};
pub use ops::UpdateResult;
pub use shipments::{OrderSender, ShipmentReceiver, ShipmentSession};

// Re-export proto types that clients need
pub use consign_proto::consign::v1::{CombinedShipment, Order, OrderId};
