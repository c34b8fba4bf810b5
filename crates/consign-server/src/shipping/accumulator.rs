//! Per-destination shipment accumulator.
//!
//! Groups resolved orders into combined shipments keyed by destination for
//! the current batch window. Emission order across destinations follows map
//! iteration order and is unspecified.

use std::collections::HashMap;

use crate::proto::consign::v1::{CombinedShipment, Order};

/// Status label stamped on every combined shipment.
pub const SHIPMENT_STATUS: &str = "Processed!";

/// Derive a combined shipment identifier from its destination.
pub fn shipment_id(destination: &str) -> String {
    format!("cmb - {destination}")
}

/// In-progress combined shipments for one session, keyed by destination.
#[derive(Debug, Default)]
pub struct ShipmentAccumulator {
    shipments: HashMap<String, CombinedShipment>,
}

impl ShipmentAccumulator {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge an order into the shipment for its destination.
    ///
    /// Appends to the existing shipment if one is open in this batch window,
    /// otherwise opens a new shipment seeded with this order.
    pub fn merge(&mut self, order: Order) {
        match self.shipments.get_mut(&order.destination) {
            Some(shipment) => shipment.order_list.push(order),
            None => {
                let destination = order.destination.clone();
                let shipment = CombinedShipment {
                    id: shipment_id(&destination),
                    status: SHIPMENT_STATUS.to_string(),
                    order_list: vec![order],
                };
                self.shipments.insert(destination, shipment);
            }
        }
    }

    /// Take every accumulated shipment, leaving the accumulator empty.
    pub fn drain(&mut self) -> Vec<CombinedShipment> {
        self.shipments.drain().map(|(_, shipment)| shipment).collect()
    }

    /// Number of open shipments (distinct destinations).
    pub fn len(&self) -> usize {
        self.shipments.len()
    }

    /// Whether no shipment is open.
    pub fn is_empty(&self) -> bool {
        self.shipments.is_empty()
    }

    /// Total orders held across all open shipments.
    pub fn pending_orders(&self) -> usize {
        self.shipments.values().map(|s| s.order_list.len()).sum()
    }
}
