//! UpdateOrders RPC handler.
//!
//! Each order is written as soon as it arrives. A rejected order fails the
//! call, but orders already written stay written.

use std::sync::Arc;
use tonic::{Request, Response, Status, Streaming};

use crate::observability::metrics::record_rpc;
use crate::proto::consign::v1::{Order, UpdateOrdersResponse};
use crate::server::ServerState;

/// Handle an UpdateOrders RPC request.
#[tracing::instrument(skip(state, request))]
pub async fn handle_update_orders(
    state: &Arc<ServerState>,
    request: Request<Streaming<Order>>,
) -> Result<Response<UpdateOrdersResponse>, Status> {
    record_rpc("UpdateOrders");
    let mut inbound = request.into_inner();
    let mut order_ids = Vec::new();

    while let Some(order) = inbound.message().await? {
        let id = state.store.upsert(order).map_err(|e| {
            tracing::warn!(error = %e, updated = order_ids.len(), "Rejected order update");
            Status::from(e)
        })?;
        tracing::debug!(order_id = %id, "Order updated");
        order_ids.push(id);
    }

    tracing::info!(count = order_ids.len(), "Orders updated");
    let summary = summarize(&order_ids);
    Ok(Response::new(UpdateOrdersResponse { order_ids, summary }))
}

/// Human-readable summary of the updated order IDs.
fn summarize(order_ids: &[String]) -> String {
    format!("orders processed: {}", order_ids.join(", "))
}
