//! Stream session controller for `ProcessOrders`.
//!
//! A session owns its accumulator and batch counter outright. It is driven by
//! exactly one task, so the receive loop and the flush logic never race; the
//! outbound direction only ever sees shipments that were already drained.
//!
//! Lifecycle:
//! - `AwaitingInput` until the caller sends an order ID or ends the stream
//! - `ProcessingItem` while the ID is resolved and merged
//! - `Flushing` when the batch counter reaches the batch size
//! - `Terminated` after the final flush, or immediately on a fatal error

use clap::ValueEnum;
use futures::{Stream, StreamExt};
use std::time::Instant;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tonic::Status;

use super::accumulator::ShipmentAccumulator;
use super::batch::{BatchConfig, BatchCounter};
use crate::observability::metrics::{
    record_order_processed, record_order_rejected, record_shipment_emitted,
};
use crate::proto::consign::v1::{CombinedShipment, OrderId};
use crate::store::orders::MAX_ORDER_ID_LEN;
use crate::store::{OrderLookup, StoreError};

/// Outbound half of a session: shipments, or a terminal status.
pub type ShipmentSender = mpsc::Sender<Result<CombinedShipment, Status>>;

/// Error type for streaming sessions.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("order does not exist: {order_id}")]
    OrderNotFound { order_id: String },

    #[error("malformed order id: {reason}")]
    MalformedInput { reason: String },

    #[error("failed to receive from caller: {0}")]
    Receive(Status),

    #[error("caller closed the response stream")]
    SendClosed,

    #[error("server is shutting down")]
    Shutdown,
}

impl SessionError {
    /// Whether this error concerns a single inbound item rather than the stream.
    pub fn is_per_item(&self) -> bool {
        matches!(
            self,
            SessionError::OrderNotFound { .. } | SessionError::MalformedInput { .. }
        )
    }

    /// Short label used for metrics and logs.
    pub fn reason(&self) -> &'static str {
        match self {
            SessionError::OrderNotFound { .. } => "not_found",
            SessionError::MalformedInput { .. } => "malformed",
            SessionError::Receive(_) => "receive",
            SessionError::SendClosed => "send_closed",
            SessionError::Shutdown => "shutdown",
        }
    }
}

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { order_id } => SessionError::OrderNotFound { order_id },
            StoreError::InvalidOrder { reason } => SessionError::MalformedInput { reason },
        }
    }
}

impl From<SessionError> for Status {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::OrderNotFound { .. } => Status::not_found(err.to_string()),
            SessionError::MalformedInput { .. } => Status::invalid_argument(err.to_string()),
            SessionError::Receive(status) => status,
            SessionError::SendClosed => Status::cancelled(err.to_string()),
            SessionError::Shutdown => Status::unavailable(err.to_string()),
        }
    }
}

/// What to do when an inbound order ID cannot be resolved or is malformed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LookupFailurePolicy {
    /// Report the rejection and keep the session running.
    #[default]
    Skip,
    /// Fail the whole session with the per-item error.
    Abort,
}

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    AwaitingInput,
    ProcessingItem,
    Flushing,
    Terminated,
}

/// Counters reported when a session ends cleanly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub orders_processed: u64,
    pub shipments_emitted: u64,
    pub flushes: u64,
    pub rejected: u64,
}

/// State for one `ProcessOrders` call.
#[derive(Debug)]
pub struct ShipmentSession<L> {
    lookup: L,
    policy: LookupFailurePolicy,
    accumulator: ShipmentAccumulator,
    counter: BatchCounter,
    phase: SessionPhase,
    summary: SessionSummary,
}

impl<L: OrderLookup> ShipmentSession<L> {
    /// Create a session with an empty accumulator and a zero counter.
    pub fn new(lookup: L, batch: BatchConfig, policy: LookupFailurePolicy) -> Self {
        Self {
            lookup,
            policy,
            accumulator: ShipmentAccumulator::new(),
            counter: BatchCounter::new(batch),
            phase: SessionPhase::AwaitingInput,
            summary: SessionSummary::default(),
        }
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Orders processed since the last flush.
    pub fn pending_count(&self) -> usize {
        self.counter.count()
    }

    /// Counters so far.
    pub fn summary(&self) -> SessionSummary {
        self.summary
    }

    /// Resolve and merge one inbound order ID.
    ///
    /// Returns the drained shipments when this order completes a batch.
    /// Per-item failures leave the accumulator and counter untouched.
    pub fn process_item(
        &mut self,
        order_id: &str,
    ) -> Result<Option<Vec<CombinedShipment>>, SessionError> {
        self.phase = SessionPhase::ProcessingItem;
        let outcome = self.resolve_and_merge(order_id);
        self.phase = match outcome {
            Ok(Some(_)) => SessionPhase::Flushing,
            _ => SessionPhase::AwaitingInput,
        };
        outcome
    }

    fn resolve_and_merge(
        &mut self,
        order_id: &str,
    ) -> Result<Option<Vec<CombinedShipment>>, SessionError> {
        validate_order_id(order_id)?;
        let order = self.lookup.lookup(order_id)?;

        tracing::trace!(order_id, destination = %order.destination, "Merging order");
        self.accumulator.merge(order);
        self.summary.orders_processed += 1;
        record_order_processed();

        if self.counter.increment() {
            self.summary.flushes += 1;
            return Ok(Some(self.accumulator.drain()));
        }
        Ok(None)
    }

    /// Drain everything still accumulated, for the end-of-stream flush.
    ///
    /// Calling this on an empty accumulator yields nothing.
    pub fn finish(&mut self) -> Vec<CombinedShipment> {
        self.phase = SessionPhase::Flushing;
        self.counter.reset();
        let remaining = self.accumulator.drain();
        if !remaining.is_empty() {
            self.summary.flushes += 1;
        }
        remaining
    }

    /// Drop all unflushed state after a fatal error.
    fn abort(&mut self, err: SessionError) -> SessionError {
        let discarded = self.accumulator.pending_orders();
        self.accumulator.drain();
        self.counter.reset();
        self.phase = SessionPhase::Terminated;

        tracing::warn!(
            reason = err.reason(),
            discarded_orders = discarded,
            error = %err,
            "Session aborted"
        );
        err
    }

    /// Send a batch of shipments to the caller.
    ///
    /// A caller that stops reading fills the outbound buffer; shutdown still
    /// wins over a send that is waiting for capacity.
    async fn emit(
        &mut self,
        outbound: &ShipmentSender,
        shutdown: &CancellationToken,
        shipments: Vec<CombinedShipment>,
    ) -> Result<(), SessionError> {
        for shipment in shipments {
            let order_count = shipment.order_list.len();
            tracing::debug!(
                shipment_id = %shipment.id,
                orders = order_count,
                "Shipping combined shipment"
            );
            tokio::select! {
                biased;
                () = shutdown.cancelled() => return Err(SessionError::Shutdown),
                sent = outbound.send(Ok(shipment)) => {
                    sent.map_err(|_| SessionError::SendClosed)?;
                }
            }
            self.summary.shipments_emitted += 1;
            record_shipment_emitted(order_count);
        }
        if self.phase == SessionPhase::Flushing {
            self.phase = SessionPhase::AwaitingInput;
        }
        Ok(())
    }

    /// Drive the session until the caller ends the stream or a fatal error.
    ///
    /// On success every accumulated shipment has been sent and the outbound
    /// channel can be dropped to close the stream. On error nothing further
    /// has been sent; the caller decides whether to forward a status.
    pub async fn run<S>(
        mut self,
        mut inbound: S,
        outbound: &ShipmentSender,
        shutdown: &CancellationToken,
    ) -> Result<SessionSummary, SessionError>
    where
        S: Stream<Item = Result<OrderId, Status>> + Unpin,
    {
        let started = Instant::now();

        loop {
            self.phase = SessionPhase::AwaitingInput;
            let next = tokio::select! {
                biased;
                () = shutdown.cancelled() => return Err(self.abort(SessionError::Shutdown)),
                next = inbound.next() => next,
            };

            let order_id = match next {
                Some(Ok(order_id)) => order_id.value,
                Some(Err(status)) => return Err(self.abort(SessionError::Receive(status))),
                None => break,
            };

            match self.process_item(&order_id) {
                Ok(Some(batch)) => {
                    if let Err(e) = self.emit(outbound, shutdown, batch).await {
                        return Err(self.abort(e));
                    }
                }
                Ok(None) => {}
                Err(e) if e.is_per_item() && self.policy == LookupFailurePolicy::Skip => {
                    self.summary.rejected += 1;
                    record_order_rejected(e.reason());
                    tracing::warn!(order_id = %order_id, error = %e, "Rejected order");
                }
                Err(e) => {
                    record_order_rejected(e.reason());
                    return Err(self.abort(e));
                }
            }
        }

        tracing::debug!(
            pending = self.accumulator.pending_orders(),
            "Caller finished sending, flushing remaining shipments"
        );
        let remaining = self.finish();
        if let Err(e) = self.emit(outbound, shutdown, remaining).await {
            return Err(self.abort(e));
        }
        self.phase = SessionPhase::Terminated;

        tracing::info!(
            orders = self.summary.orders_processed,
            shipments = self.summary.shipments_emitted,
            flushes = self.summary.flushes,
            rejected = self.summary.rejected,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Session complete"
        );
        Ok(self.summary)
    }
}

/// Reject order IDs that cannot name a stored order.
fn validate_order_id(order_id: &str) -> Result<(), SessionError> {
    if order_id.trim().is_empty() {
        return Err(SessionError::MalformedInput {
            reason: "order id cannot be empty".to_string(),
        });
    }

    if order_id.len() > MAX_ORDER_ID_LEN {
        return Err(SessionError::MalformedInput {
            reason: format!("order id too long (max {MAX_ORDER_ID_LEN} characters)"),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::consign::v1::Order;
    use crate::store::seed::sample_orders;
    use crate::store::OrderStore;
    use std::collections::BTreeMap;
    use std::num::NonZeroUsize;

    fn store() -> OrderStore {
        OrderStore::with_orders(sample_orders()).unwrap()
    }

    fn batch(size: usize) -> BatchConfig {
        BatchConfig::from_config(NonZeroUsize::new(size).unwrap())
    }

    fn ids(values: &[&str]) -> Vec<Result<OrderId, Status>> {
        values
            .iter()
            .map(|v| Ok(OrderId { value: v.to_string() }))
            .collect()
    }

    fn shipment_order_ids(shipment: &CombinedShipment) -> Vec<String> {
        shipment.order_list.iter().map(|o| o.id.clone()).collect()
    }

    /// Run a full session over the given inbound items and collect the output.
    async fn run_session(
        inbound: Vec<Result<OrderId, Status>>,
        size: usize,
        policy: LookupFailurePolicy,
    ) -> (Result<SessionSummary, SessionError>, Vec<CombinedShipment>) {
        let (tx, mut rx) = mpsc::channel(64);
        let session = ShipmentSession::new(store(), batch(size), policy);
        let result = session
            .run(futures::stream::iter(inbound), &tx, &CancellationToken::new())
            .await;
        drop(tx);

        let mut shipments = Vec::new();
        while let Some(item) = rx.recv().await {
            shipments.push(item.expect("session never sends error statuses itself"));
        }
        (result, shipments)
    }

    #[test]
    fn test_scenario_a_flushes_on_third_item() {
        let mut session = ShipmentSession::new(store(), batch(3), LookupFailurePolicy::Skip);

        assert!(session.process_item("102").unwrap().is_none());
        assert!(session.process_item("103").unwrap().is_none());
        assert_eq!(session.pending_count(), 2);

        let mut flushed = session.process_item("104").unwrap().expect("batch due");
        flushed.sort_by(|a, b| a.id.cmp(&b.id));

        assert_eq!(flushed.len(), 2);
        assert_eq!(flushed[0].id, "cmb - Mountain View, CA");
        assert_eq!(shipment_order_ids(&flushed[0]), vec!["102", "104"]);
        assert_eq!(flushed[1].id, "cmb - San Jose, CA");
        assert_eq!(shipment_order_ids(&flushed[1]), vec!["103"]);

        assert_eq!(session.pending_count(), 0);
        assert_eq!(session.phase(), SessionPhase::Flushing);
        assert!(session.finish().is_empty());
    }

    #[test]
    fn test_scenario_b_nothing_before_stream_end() {
        let mut session = ShipmentSession::new(store(), batch(3), LookupFailurePolicy::Skip);

        assert!(session.process_item("102").unwrap().is_none());
        assert!(session.process_item("104").unwrap().is_none());

        let remaining = session.finish();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, "cmb - Mountain View, CA");
        assert_eq!(shipment_order_ids(&remaining[0]), vec!["102", "104"]);
    }

    #[test]
    fn test_unknown_order_leaves_state_untouched() {
        let mut session = ShipmentSession::new(store(), batch(3), LookupFailurePolicy::Skip);
        session.process_item("102").unwrap();

        let err = session.process_item("999").unwrap_err();
        assert!(matches!(err, SessionError::OrderNotFound { ref order_id } if order_id == "999"));
        assert!(err.is_per_item());
        assert_eq!(session.pending_count(), 1);
        assert_eq!(session.phase(), SessionPhase::AwaitingInput);

        let remaining = session.finish();
        assert_eq!(remaining.len(), 1);
        assert_eq!(shipment_order_ids(&remaining[0]), vec!["102"]);
    }

    #[test]
    fn test_malformed_ids_rejected() {
        let mut session = ShipmentSession::new(store(), batch(3), LookupFailurePolicy::Skip);

        let too_long = "9".repeat(MAX_ORDER_ID_LEN + 1);
        for bad in ["", "   ", too_long.as_str()] {
            let err = session.process_item(bad).unwrap_err();
            assert!(matches!(err, SessionError::MalformedInput { .. }), "{bad:?}");
        }
        assert_eq!(session.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_run_scenario_a_then_end() {
        let (result, shipments) =
            run_session(ids(&["102", "103", "104"]), 3, LookupFailurePolicy::Skip).await;

        let summary = result.unwrap();
        assert_eq!(summary.orders_processed, 3);
        assert_eq!(summary.flushes, 1);
        assert_eq!(summary.shipments_emitted, 2);
        assert_eq!(shipments.len(), 2);
    }

    #[tokio::test]
    async fn test_run_scenario_b_single_final_shipment() {
        let (result, shipments) =
            run_session(ids(&["102", "104"]), 3, LookupFailurePolicy::Skip).await;

        assert_eq!(result.unwrap().flushes, 1);
        assert_eq!(shipments.len(), 1);
        assert_eq!(shipment_order_ids(&shipments[0]), vec!["102", "104"]);
    }

    #[tokio::test]
    async fn test_run_scenario_c_skip_unknown() {
        let (result, shipments) =
            run_session(ids(&["102", "101", "104"]), 3, LookupFailurePolicy::Skip).await;

        let summary = result.unwrap();
        assert_eq!(summary.rejected, 1);
        assert_eq!(summary.orders_processed, 2);
        assert_eq!(shipments.len(), 1);
        assert!(shipments
            .iter()
            .flat_map(|s| s.order_list.iter())
            .all(|o| o.id != "101"));
    }

    #[tokio::test]
    async fn test_run_scenario_c_abort_unknown() {
        let (result, shipments) =
            run_session(ids(&["102", "101", "104"]), 3, LookupFailurePolicy::Abort).await;

        let err = result.unwrap_err();
        assert!(matches!(err, SessionError::OrderNotFound { .. }));
        assert_eq!(Status::from(err).code(), tonic::Code::NotFound);
        // Order 102 was pending and is discarded with the session
        assert!(shipments.is_empty());
    }

    #[tokio::test]
    async fn test_run_scenario_d_sessions_are_isolated() {
        let (first, mut a) =
            run_session(ids(&["102", "103", "104"]), 3, LookupFailurePolicy::Skip).await;
        let (second, mut b) =
            run_session(ids(&["102", "103", "104"]), 3, LookupFailurePolicy::Skip).await;

        a.sort_by(|x, y| x.id.cmp(&y.id));
        b.sort_by(|x, y| x.id.cmp(&y.id));
        assert_eq!(a, b);
        assert_eq!(first.unwrap(), second.unwrap());
    }

    #[tokio::test]
    async fn test_run_flushes_at_multiples_and_at_end() {
        // 7 orders with batch size 3: flushes after 3, 6, and the final one
        let inbound = ids(&["102", "103", "104", "105", "106", "102", "103"]);
        let (result, shipments) = run_session(inbound, 3, LookupFailurePolicy::Skip).await;

        let summary = result.unwrap();
        assert_eq!(summary.flushes, 3);
        assert_eq!(summary.orders_processed, 7);

        // Batch 1: {102,104} MV + {103} SJ; batch 2: {105} SJ + {106,102} MV; batch 3: {103} SJ
        assert_eq!(shipments.len(), 5);
    }

    #[tokio::test]
    async fn test_run_conserves_orders() {
        let sequence = [
            "102", "103", "104", "105", "106", "106", "105", "104", "103", "102", "104",
        ];
        let (result, shipments) = run_session(ids(&sequence), 4, LookupFailurePolicy::Skip).await;
        result.unwrap();

        let mut sent: BTreeMap<String, usize> = BTreeMap::new();
        for id in sequence {
            *sent.entry(id.to_string()).or_default() += 1;
        }

        let mut received: BTreeMap<String, usize> = BTreeMap::new();
        for shipment in &shipments {
            for order in &shipment.order_list {
                assert_eq!(shipment.id, format!("cmb - {}", order.destination));
                *received.entry(order.id.clone()).or_default() += 1;
            }
        }
        assert_eq!(sent, received);
    }

    #[tokio::test]
    async fn test_run_empty_stream_emits_nothing() {
        let (result, shipments) = run_session(Vec::new(), 3, LookupFailurePolicy::Skip).await;

        assert_eq!(result.unwrap(), SessionSummary::default());
        assert!(shipments.is_empty());
    }

    #[tokio::test]
    async fn test_run_receive_error_discards_pending() {
        let mut inbound = ids(&["102", "103"]);
        inbound.push(Err(Status::data_loss("connection reset")));
        inbound.extend(ids(&["104"]));

        let (result, shipments) = run_session(inbound, 3, LookupFailurePolicy::Skip).await;

        let err = result.unwrap_err();
        assert!(matches!(err, SessionError::Receive(_)));
        assert_eq!(Status::from(err).code(), tonic::Code::DataLoss);
        assert!(shipments.is_empty());
    }

    #[tokio::test]
    async fn test_run_send_closed_aborts() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let session = ShipmentSession::new(store(), batch(1), LookupFailurePolicy::Skip);
        let result = session
            .run(
                futures::stream::iter(ids(&["102", "103"])),
                &tx,
                &CancellationToken::new(),
            )
            .await;

        assert!(matches!(result, Err(SessionError::SendClosed)));
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let (tx, mut rx) = mpsc::channel(8);
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let session = ShipmentSession::new(store(), batch(3), LookupFailurePolicy::Skip);
        let result = session
            .run(
                futures::stream::pending::<Result<OrderId, Status>>(),
                &tx,
                &shutdown,
            )
            .await;
        drop(tx);

        let err = result.unwrap_err();
        assert_eq!(Status::from(err).code(), tonic::Code::Unavailable);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown_while_caller_not_reading() {
        // Room for one shipment; the caller never reads it
        let (tx, mut rx) = mpsc::channel(1);
        let shutdown = CancellationToken::new();

        let canceller = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let inbound = futures::stream::iter(ids(&["102", "103", "104"]))
            .chain(futures::stream::pending());
        let session = ShipmentSession::new(store(), batch(1), LookupFailurePolicy::Skip);
        let result = tokio::time::timeout(
            std::time::Duration::from_secs(2),
            session.run(inbound, &tx, &shutdown),
        )
        .await
        .expect("shutdown must interrupt a blocked send");

        assert!(matches!(result, Err(SessionError::Shutdown)));
        // Only the first shipment made it out before the buffer filled
        assert_eq!(shipment_order_ids(&rx.try_recv().unwrap().unwrap()), vec!["102"]);
    }

    #[test]
    fn test_custom_lookup_is_injected() {
        struct SingleOrder;

        impl OrderLookup for SingleOrder {
            fn lookup(&self, order_id: &str) -> Result<Order, StoreError> {
                Ok(Order {
                    id: order_id.to_string(),
                    items: vec!["Widget".to_string()],
                    destination: "Everywhere".to_string(),
                    price: 0.0,
                })
            }
        }

        let mut session = ShipmentSession::new(SingleOrder, batch(2), LookupFailurePolicy::Skip);
        assert!(session.process_item("a").unwrap().is_none());
        let flushed = session.process_item("b").unwrap().unwrap();

        assert_eq!(flushed.len(), 1);
        assert_eq!(shipment_order_ids(&flushed[0]), vec!["a", "b"]);
    }
}
