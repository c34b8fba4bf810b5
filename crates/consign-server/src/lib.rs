//! Consign: a gRPC order service that folds live order streams into combined
//! shipments.
//!
//! Orders are held in an in-memory store and exposed through four call
//! shapes: unary lookups, a server-streaming search, a client-streaming bulk
//! update, and the bidirectional `ProcessOrders` stream that groups orders by
//! destination and flushes combined shipments back to the caller.
//!
//! # Architecture
//!
//! - **gRPC-Native**: All communication via tonic/prost generated code
//! - **Session-Scoped Aggregation**: Each `ProcessOrders` call owns its own
//!   accumulator; nothing is shared between sessions except the order store
//! - **Observable**: structured tracing, optional OTLP export, Prometheus metrics
//!
//! # Modules
//!
//! - [`config`]: CLI and environment configuration
//! - [`observability`]: Metrics and tracing setup
//! - [`proto`]: Re-exported protobuf code
//! - [`server`]: gRPC server setup
//! - [`service`]: RPC handlers
//! - [`shipping`]: Shipment accumulator, flush policy, and stream sessions
//! - [`store`]: In-memory order store and seed data

// Lint configuration
#![warn(clippy::all)]
#![allow(
    clippy::module_name_repetitions,    // store::orders::OrderStore is fine
    clippy::must_use_candidate,         // Not all functions need #[must_use]
    clippy::missing_errors_doc,         // Error docs can be verbose
    clippy::missing_panics_doc,         // Panic docs can be verbose
    clippy::too_many_lines              // Some functions are inherently long
)]

pub mod config;
pub mod observability;
pub mod server;
pub mod service;
pub mod shipping;
pub mod store;

pub use consign_proto as proto;

use uuid::Uuid;

/// Generate a new UUIDv7 (time-sortable) identifier.
///
/// Used for store-assigned order IDs and for streaming session IDs.
///
/// # Example
///
/// ```
/// let id = consign_server::generate_id();
/// assert!(id.len() == 36); // UUID string format
/// ```
#[must_use]
pub fn generate_id() -> String {
    Uuid::now_v7().to_string()
}
