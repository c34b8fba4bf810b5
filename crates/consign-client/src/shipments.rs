//! ProcessOrders session handling for the Consign client.

use anyhow::{anyhow, Context, Result};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::transport::Channel;
use tonic::Streaming;

use consign_proto::consign::v1::order_management_client::OrderManagementClient;
use consign_proto::consign::v1::{CombinedShipment, OrderId};

/// Order IDs buffered client-side before `send` waits on the server.
const SEND_BUFFER: usize = 32;

/// Sending half of a ProcessOrders session.
///
/// Clones share the same request stream; the stream ends once every clone
/// is dropped.
#[derive(Debug, Clone)]
pub struct OrderSender {
    tx: mpsc::Sender<OrderId>,
}

impl OrderSender {
    /// Send one order ID to the server.
    pub async fn send(&self, order_id: impl Into<String>) -> Result<()> {
        self.tx
            .send(OrderId {
                value: order_id.into(),
            })
            .await
            .map_err(|_| anyhow!("shipment session closed"))
    }
}

/// Receiving half of a ProcessOrders session.
#[derive(Debug)]
pub struct ShipmentReceiver {
    rx: Streaming<CombinedShipment>,
}

impl ShipmentReceiver {
    /// Get the next combined shipment, returning None once the server
    /// closes the stream.
    ///
    /// A server-side failure surfaces as an error wrapping the
    /// `tonic::Status`.
    pub async fn next_shipment(&mut self) -> Result<Option<CombinedShipment>> {
        match self.rx.next().await {
            Some(Ok(shipment)) => Ok(Some(shipment)),
            Some(Err(status)) => Err(anyhow::Error::new(status).context("shipment stream failed")),
            None => Ok(None),
        }
    }
}

/// A live ProcessOrders call.
///
/// Shipments arrive whenever a batch completes, so callers that want to
/// observe them while still sending should split the session with
/// [`ShipmentSession::into_parts`].
#[derive(Debug)]
pub struct ShipmentSession {
    sender: Option<OrderSender>,
    receiver: ShipmentReceiver,
}

impl ShipmentSession {
    /// Start a new session.
    pub(crate) async fn start(client: &mut OrderManagementClient<Channel>) -> Result<Self> {
        let (tx, rx) = mpsc::channel::<OrderId>(SEND_BUFFER);

        let response = client
            .process_orders(ReceiverStream::new(rx))
            .await
            .context("process_orders RPC failed")?;

        Ok(Self {
            sender: Some(OrderSender { tx }),
            receiver: ShipmentReceiver {
                rx: response.into_inner(),
            },
        })
    }

    /// Send one order ID to the server.
    pub async fn send(&self, order_id: impl Into<String>) -> Result<()> {
        match &self.sender {
            Some(sender) => sender.send(order_id).await,
            None => Err(anyhow!("send side already closed")),
        }
    }

    /// Signal that no more order IDs will be sent.
    ///
    /// The server then flushes whatever it still holds and ends the stream.
    pub fn close_send(&mut self) {
        self.sender = None;
    }

    /// Get the next combined shipment.
    pub async fn next_shipment(&mut self) -> Result<Option<CombinedShipment>> {
        self.receiver.next_shipment().await
    }

    /// Split into independently owned halves.
    ///
    /// Returns an error if the send side was already closed.
    pub fn into_parts(self) -> Result<(OrderSender, ShipmentReceiver)> {
        let sender = self
            .sender
            .ok_or_else(|| anyhow!("send side already closed"))?;
        Ok((sender, self.receiver))
    }
}
