//! gRPC service handlers for Consign.

pub mod orders;
pub mod process;
pub mod registry;
pub mod search;
pub mod update;

pub use registry::{SessionGuard, SessionRegistry};

use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;
use tonic::{Request, Response, Status, Streaming};

use crate::proto::consign::v1::order_management_server::OrderManagement;
use crate::proto::consign::v1::{
    CombinedShipment, Order, OrderId, SearchQuery, UpdateOrdersResponse,
};
use crate::server::ServerState;

/// Consign gRPC service implementation.
pub struct OrderManagementService {
    state: Arc<ServerState>,
}

impl OrderManagementService {
    /// Create a new service with shared state.
    pub fn new(state: Arc<ServerState>) -> Self {
        Self { state }
    }
}

/// Response stream for SearchOrders.
pub type SearchOrdersStream = Pin<Box<dyn Stream<Item = Result<Order, Status>> + Send + 'static>>;

/// Response stream for ProcessOrders.
pub type ProcessOrdersStream =
    Pin<Box<dyn Stream<Item = Result<CombinedShipment, Status>> + Send + 'static>>;

#[tonic::async_trait]
impl OrderManagement for OrderManagementService {
    async fn add_order(&self, request: Request<Order>) -> Result<Response<OrderId>, Status> {
        orders::handle_add_order(&self.state, request).await
    }

    async fn get_order(&self, request: Request<OrderId>) -> Result<Response<Order>, Status> {
        orders::handle_get_order(&self.state, request).await
    }

    type SearchOrdersStream = SearchOrdersStream;

    async fn search_orders(
        &self,
        request: Request<SearchQuery>,
    ) -> Result<Response<Self::SearchOrdersStream>, Status> {
        search::handle_search_orders(&self.state, request).await
    }

    async fn update_orders(
        &self,
        request: Request<Streaming<Order>>,
    ) -> Result<Response<UpdateOrdersResponse>, Status> {
        update::handle_update_orders(&self.state, request).await
    }

    type ProcessOrdersStream = ProcessOrdersStream;

    async fn process_orders(
        &self,
        request: Request<Streaming<OrderId>>,
    ) -> Result<Response<Self::ProcessOrdersStream>, Status> {
        process::handle_process_orders(&self.state, request).await
    }
}
