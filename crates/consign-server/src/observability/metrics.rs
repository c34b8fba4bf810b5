//! Prometheus metrics implementation.
//!
//! Key metrics:
//! - consign_rpc_requests_total: Counter per RPC method
//! - consign_orders_processed_total: Orders merged into shipments
//! - consign_order_rejections_total: Inbound order IDs rejected, by reason
//! - consign_shipments_emitted_total: Combined shipments sent to callers
//! - consign_shipment_orders: Histogram of orders per emitted shipment
//! - consign_sessions_active: Gauge of live ProcessOrders sessions
//! - consign_sessions_total: Finished sessions, by outcome
//! - consign_session_duration_seconds: Histogram of session lifetimes

use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};
use std::sync::OnceLock;

/// Global metrics instance.
static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Consign metrics registry.
#[derive(Debug)]
pub struct Metrics {
    registry: Registry,
    /// RPC calls received, labelled by method.
    pub rpc_requests: IntCounterVec,
    /// Orders merged into a combined shipment.
    pub orders_processed: IntCounter,
    /// Inbound order IDs rejected, labelled by reason.
    pub order_rejections: IntCounterVec,
    /// Combined shipments sent to callers.
    pub shipments_emitted: IntCounter,
    /// Orders carried by each emitted shipment.
    pub shipment_orders: Histogram,
    /// Live ProcessOrders sessions.
    pub sessions_active: IntGauge,
    /// Finished sessions, labelled by outcome.
    pub sessions_total: IntCounterVec,
    /// Session lifetime in seconds.
    pub session_duration: Histogram,
}

impl Metrics {
    /// Create and register every metric in a fresh registry.
    fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let rpc_requests = IntCounterVec::new(
            Opts::new("consign_rpc_requests_total", "RPC calls received"),
            &["method"],
        )?;
        let orders_processed = IntCounter::new(
            "consign_orders_processed_total",
            "Orders merged into combined shipments",
        )?;
        let order_rejections = IntCounterVec::new(
            Opts::new(
                "consign_order_rejections_total",
                "Inbound order IDs rejected by a session",
            ),
            &["reason"],
        )?;
        let shipments_emitted = IntCounter::new(
            "consign_shipments_emitted_total",
            "Combined shipments sent to callers",
        )?;
        let shipment_orders = Histogram::with_opts(
            HistogramOpts::new("consign_shipment_orders", "Orders per emitted shipment")
                .buckets(vec![1.0, 2.0, 3.0, 5.0, 10.0, 25.0, 100.0]),
        )?;
        let sessions_active =
            IntGauge::new("consign_sessions_active", "Live ProcessOrders sessions")?;
        let sessions_total = IntCounterVec::new(
            Opts::new("consign_sessions_total", "Finished ProcessOrders sessions"),
            &["outcome"],
        )?;
        let session_duration = Histogram::with_opts(HistogramOpts::new(
            "consign_session_duration_seconds",
            "ProcessOrders session lifetime",
        ))?;

        registry.register(Box::new(rpc_requests.clone()))?;
        registry.register(Box::new(orders_processed.clone()))?;
        registry.register(Box::new(order_rejections.clone()))?;
        registry.register(Box::new(shipments_emitted.clone()))?;
        registry.register(Box::new(shipment_orders.clone()))?;
        registry.register(Box::new(sessions_active.clone()))?;
        registry.register(Box::new(sessions_total.clone()))?;
        registry.register(Box::new(session_duration.clone()))?;

        Ok(Self {
            registry,
            rpc_requests,
            orders_processed,
            order_rejections,
            shipments_emitted,
            shipment_orders,
            sessions_active,
            sessions_total,
            session_duration,
        })
    }
}

/// Initialize the metrics system.
///
/// This should be called once at startup. Subsequent calls are ignored.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    if METRICS.get().is_some() {
        return Ok(());
    }
    let metrics = Metrics::new()?;
    // A concurrent initializer may have won; either instance is complete.
    let _ = METRICS.set(metrics);
    Ok(())
}

/// Get the global metrics instance, if initialized.
pub fn metrics() -> Option<&'static Metrics> {
    METRICS.get()
}

/// Registry to expose over HTTP.
///
/// Returns an empty registry if metrics were never initialized.
pub fn prometheus_registry() -> Registry {
    METRICS
        .get()
        .map(|m| m.registry.clone())
        .unwrap_or_default()
}

/// Record an incoming RPC.
pub fn record_rpc(method: &str) {
    if let Some(m) = METRICS.get() {
        m.rpc_requests.with_label_values(&[method]).inc();
    }
}

/// Record an order merged into a shipment.
pub fn record_order_processed() {
    if let Some(m) = METRICS.get() {
        m.orders_processed.inc();
    }
}

/// Record a rejected inbound order ID.
pub fn record_order_rejected(reason: &str) {
    if let Some(m) = METRICS.get() {
        m.order_rejections.with_label_values(&[reason]).inc();
    }
}

/// Record a combined shipment sent to a caller.
pub fn record_shipment_emitted(order_count: usize) {
    if let Some(m) = METRICS.get() {
        m.shipments_emitted.inc();
        m.shipment_orders.observe(order_count as f64);
    }
}

/// Record the number of live sessions.
pub fn record_sessions_active(active: usize) {
    if let Some(m) = METRICS.get() {
        m.sessions_active.set(i64::try_from(active).unwrap_or(i64::MAX));
    }
}

/// Record a finished session.
pub fn record_session_finished(outcome: &str, duration_seconds: f64) {
    if let Some(m) = METRICS.get() {
        m.sessions_total.with_label_values(&[outcome]).inc();
        m.session_duration.observe(duration_seconds);
    }
}
