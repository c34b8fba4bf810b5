//! Command implementations.

pub mod add;
pub mod get;
pub mod process;
pub mod search;
pub mod update;

use consign_client::{CombinedShipment, Order};
use serde::Serialize;

/// JSON view of an order.
#[derive(Serialize)]
pub struct OrderOutput {
    pub id: String,
    pub items: Vec<String>,
    pub destination: String,
    pub price: f64,
}

impl From<Order> for OrderOutput {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            items: order.items,
            destination: order.destination,
            price: order.price,
        }
    }
}

/// One-line text view of an order.
pub fn order_line(order: &Order) -> String {
    format!(
        "{}  {}  ${:.2}  [{}]",
        order.id,
        order.destination,
        order.price,
        order.items.join(", ")
    )
}

/// JSON view of a combined shipment.
#[derive(Serialize)]
pub struct ShipmentOutput {
    pub id: String,
    pub status: String,
    pub orders: Vec<OrderOutput>,
}

impl From<CombinedShipment> for ShipmentOutput {
    fn from(shipment: CombinedShipment) -> Self {
        Self {
            id: shipment.id,
            status: shipment.status,
            orders: shipment.order_list.into_iter().map(OrderOutput::from).collect(),
        }
    }
}
