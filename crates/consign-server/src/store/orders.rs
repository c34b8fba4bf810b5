//! Order store shared by every RPC handler.
//!
//! Readers take a shared lock and receive cloned records, so a concurrent
//! replace never exposes a half-written order.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tonic::Status;

use crate::generate_id;
use crate::proto::consign::v1::Order;

/// Maximum order identifier length.
pub const MAX_ORDER_ID_LEN: usize = 128;

/// Error type for order store operations.
#[derive(Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("order does not exist: {order_id}")]
    NotFound { order_id: String },

    #[error("invalid order: {reason}")]
    InvalidOrder { reason: String },
}

impl From<StoreError> for Status {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => Status::not_found(err.to_string()),
            StoreError::InvalidOrder { .. } => Status::invalid_argument(err.to_string()),
        }
    }
}

/// Read access to orders, as seen by a streaming session.
pub trait OrderLookup: Send + Sync + 'static {
    /// Resolve an order identifier to its current record.
    fn lookup(&self, order_id: &str) -> Result<Order, StoreError>;
}

/// Concurrent in-memory order store.
///
/// Cloning is cheap; clones share the same underlying map.
#[derive(Clone, Debug, Default)]
pub struct OrderStore {
    orders: Arc<RwLock<HashMap<String, Order>>>,
}

impl OrderStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with the given orders.
    ///
    /// Every order is validated; the first invalid one aborts the load.
    pub fn with_orders<I>(orders: I) -> Result<Self, StoreError>
    where
        I: IntoIterator<Item = Order>,
    {
        let store = Self::new();
        for order in orders {
            store.upsert(order)?;
        }
        Ok(store)
    }

    /// Insert or fully replace an order by identifier.
    ///
    /// An empty identifier is replaced with a freshly generated one.
    /// Returns the identifier the order was stored under.
    pub fn upsert(&self, mut order: Order) -> Result<String, StoreError> {
        if order.id.is_empty() {
            order.id = generate_id();
        }
        validate_order(&order)?;

        let id = order.id.clone();
        self.orders
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone(), order);
        Ok(id)
    }

    /// Store an order under a new store-assigned identifier.
    ///
    /// Any identifier supplied by the caller is ignored.
    pub fn insert_new(&self, mut order: Order) -> Result<String, StoreError> {
        order.id = generate_id();
        self.upsert(order)
    }

    /// Return all orders with at least one item containing `query`.
    ///
    /// Results are sorted by identifier for stable output.
    pub fn search(&self, query: &str) -> Vec<Order> {
        let orders = self.orders.read().unwrap_or_else(PoisonError::into_inner);
        let mut matches: Vec<Order> = orders
            .values()
            .filter(|order| order.items.iter().any(|item| item.contains(query)))
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.id.cmp(&b.id));
        matches
    }

    /// Number of stored orders.
    pub fn len(&self) -> usize {
        self.orders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the store holds no orders.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl OrderLookup for OrderStore {
    fn lookup(&self, order_id: &str) -> Result<Order, StoreError> {
        self.orders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(order_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                order_id: order_id.to_string(),
            })
    }
}

/// Check an order before it is written.
pub fn validate_order(order: &Order) -> Result<(), StoreError> {
    if order.id.len() > MAX_ORDER_ID_LEN {
        return Err(StoreError::InvalidOrder {
            reason: format!("order id too long (max {MAX_ORDER_ID_LEN} characters)"),
        });
    }

    if order.destination.trim().is_empty() {
        return Err(StoreError::InvalidOrder {
            reason: format!("order {} has no destination", order.id),
        });
    }

    if !order.price.is_finite() || order.price < 0.0 {
        return Err(StoreError::InvalidOrder {
            reason: format!("order {} has invalid price {}", order.id, order.price),
        });
    }

    Ok(())
}
