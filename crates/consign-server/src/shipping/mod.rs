//! Combined-shipment aggregation for the `ProcessOrders` stream.
//!
//! Provides:
//! - Per-destination shipment accumulator
//! - Batch-size flush policy
//! - Per-call stream session controller

pub mod accumulator;
pub mod batch;
pub mod session;

pub use accumulator::{shipment_id, ShipmentAccumulator, SHIPMENT_STATUS};
pub use batch::{BatchConfig, BatchCounter};
pub use session::{
    LookupFailurePolicy, SessionError, SessionPhase, SessionSummary, ShipmentSender,
    ShipmentSession,
};
