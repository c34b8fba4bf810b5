//! In-memory order storage for Consign.
//!
//! Provides:
//! - Concurrent order store with replace-by-identifier writes
//! - The `OrderLookup` seam used by streaming sessions
//! - Built-in sample data and JSON seed files

pub mod orders;
pub mod seed;

pub use orders::{OrderLookup, OrderStore, StoreError};
