//! ProcessOrders RPC handler.
//!
//! Each call gets its own [`ShipmentSession`] running on a dedicated task.
//! The task reads order IDs from the caller and writes combined shipments to
//! a bounded channel that backs the response stream.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tonic::{Request, Response, Status, Streaming};
use tracing::Instrument;

use crate::observability::metrics::record_rpc;
use crate::proto::consign::v1::OrderId;
use crate::server::ServerState;
use crate::shipping::{SessionError, ShipmentSender, ShipmentSession};

use super::ProcessOrdersStream;

/// Handle a ProcessOrders RPC request.
///
/// Returns immediately with the response stream; shipments arrive as
/// batches complete and once more when the caller closes its side.
pub async fn handle_process_orders(
    state: &Arc<ServerState>,
    request: Request<Streaming<OrderId>>,
) -> Result<Response<ProcessOrdersStream>, Status> {
    record_rpc("ProcessOrders");
    let inbound = request.into_inner();

    let mut guard = state.sessions.register();
    let span = tracing::info_span!("process_orders", session_id = %guard.id());

    let session = ShipmentSession::new(state.store.clone(), state.batch, state.lookup_policy);
    let (tx, rx) = mpsc::channel(state.outbound_buffer.max(1));

    tokio::spawn(
        async move {
            tracing::info!("Session started");
            let shutdown = guard.cancellation().clone();

            if let Err(e) = session.run(inbound, &tx, &shutdown).await {
                guard.set_outcome(e.reason());
                // Nobody is listening once the response stream is gone
                if !matches!(e, SessionError::SendClosed) {
                    let status = Status::from(e);
                    tracing::debug!(code = ?status.code(), "Ending session with error status");
                    if !send_final_status(&tx, status, &shutdown).await {
                        tracing::debug!("Caller not reading, final status dropped");
                    }
                }
            }
        }
        .instrument(span),
    );

    Ok(Response::new(Box::pin(ReceiverStream::new(rx))))
}

/// Queue the terminal status for the caller.
///
/// Once shutdown has started this only takes a free buffer slot and never
/// waits. Returns whether the status was queued.
async fn send_final_status(
    tx: &ShipmentSender,
    status: Status,
    shutdown: &CancellationToken,
) -> bool {
    if shutdown.is_cancelled() {
        return tx.try_send(Err(status)).is_ok();
    }

    tokio::select! {
        biased;
        () = shutdown.cancelled() => false,
        sent = tx.send(Err(status)) => sent.is_ok(),
    }
}
