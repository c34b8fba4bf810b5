//! SearchOrders RPC handler.
//!
//! Matches are taken from a snapshot of the store and streamed from a
//! spawned task, so a slow reader never holds the store lock.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status};
use tracing::Instrument;

use crate::observability::metrics::record_rpc;
use crate::proto::consign::v1::SearchQuery;
use crate::server::ServerState;

use super::SearchOrdersStream;

/// Handle a SearchOrders RPC request.
pub async fn handle_search_orders(
    state: &Arc<ServerState>,
    request: Request<SearchQuery>,
) -> Result<Response<SearchOrdersStream>, Status> {
    record_rpc("SearchOrders");
    let query = request.into_inner().value;

    let matches = state.store.search(&query);
    tracing::debug!(query = %query, matches = matches.len(), "Searching orders");

    let (tx, rx) = mpsc::channel(state.outbound_buffer.max(1));
    let span = tracing::debug_span!("search_orders", query = %query);

    tokio::spawn(
        async move {
            for order in matches {
                tracing::trace!(order_id = %order.id, "Matching order found");
                if tx.send(Ok(order)).await.is_err() {
                    tracing::debug!("Caller dropped search stream");
                    return;
                }
            }
        }
        .instrument(span),
    );

    Ok(Response::new(Box::pin(ReceiverStream::new(rx))))
}
