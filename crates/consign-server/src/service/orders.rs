//! Unary order RPC handlers: AddOrder and GetOrder.

use std::sync::Arc;
use tonic::{Request, Response, Status};

use crate::observability::metrics::record_rpc;
use crate::proto::consign::v1::{Order, OrderId};
use crate::server::ServerState;
use crate::store::orders::MAX_ORDER_ID_LEN;
use crate::store::OrderLookup;

/// Handle an AddOrder RPC request.
///
/// The order is stored under a new server-assigned identifier, whatever ID
/// the caller supplied.
#[tracing::instrument(skip(state, request), fields(order_id))]
pub async fn handle_add_order(
    state: &Arc<ServerState>,
    request: Request<Order>,
) -> Result<Response<OrderId>, Status> {
    record_rpc("AddOrder");
    let order = request.into_inner();

    let id = state.store.insert_new(order)?;
    tracing::Span::current().record("order_id", id.as_str());
    tracing::info!("Order added");

    Ok(Response::new(OrderId { value: id }))
}

/// Handle a GetOrder RPC request.
#[tracing::instrument(skip(state, request), fields(order_id))]
pub async fn handle_get_order(
    state: &Arc<ServerState>,
    request: Request<OrderId>,
) -> Result<Response<Order>, Status> {
    record_rpc("GetOrder");
    let OrderId { value: order_id } = request.into_inner();

    if order_id.trim().is_empty() {
        return Err(Status::invalid_argument("order id cannot be empty"));
    }

    if order_id.len() > MAX_ORDER_ID_LEN {
        return Err(Status::invalid_argument(format!(
            "order id too long (max {MAX_ORDER_ID_LEN} characters)"
        )));
    }

    tracing::Span::current().record("order_id", order_id.as_str());

    let order = state.store.lookup(&order_id)?;
    tracing::debug!(destination = %order.destination, "Order found");
    Ok(Response::new(order))
}
