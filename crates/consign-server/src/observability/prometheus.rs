//! Operator HTTP endpoint served next to the gRPC port.
//!
//! Routes:
//! - `/metrics` - Prometheus text exposition of the consign registry
//! - `/health` - liveness, always `OK` while the process serves HTTP
//! - `/ready` - `503` once shutdown has begun or while no orders are loaded
//! - `/sessions` - JSON snapshot of live ProcessOrders sessions and store size

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use prometheus::{Encoder, Registry, TextEncoder};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;

use crate::server::ServerState;

/// What the operator endpoint reads from.
#[derive(Clone)]
pub struct OpsState {
    registry: Registry,
    server: Arc<ServerState>,
}

impl OpsState {
    pub fn new(registry: Registry, server: Arc<ServerState>) -> Self {
        Self { registry, server }
    }
}

/// Body of `GET /sessions`.
#[derive(Debug, Serialize)]
struct SessionsReport {
    active_sessions: usize,
    stored_orders: usize,
    shutting_down: bool,
}

/// Build the operator router.
pub fn ops_router(state: OpsState) -> Router {
    Router::new()
        .route("/metrics", get(scrape))
        .route("/health", get(|| async { "OK" }))
        .route("/ready", get(readiness))
        .route("/sessions", get(sessions))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn scrape(State(state): State<OpsState>) -> Response {
    let mut body = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&state.registry.gather(), &mut body) {
        tracing::error!(error = %e, "Metrics encoding failed");
        return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
    }

    (
        [(header::CONTENT_TYPE, TextEncoder::new().format_type().to_string())],
        body,
    )
        .into_response()
}

async fn readiness(State(state): State<OpsState>) -> (StatusCode, &'static str) {
    if state.server.sessions.is_shutting_down() {
        (StatusCode::SERVICE_UNAVAILABLE, "SHUTTING DOWN")
    } else if state.server.store.is_empty() {
        (StatusCode::SERVICE_UNAVAILABLE, "NO ORDERS")
    } else {
        (StatusCode::OK, "READY")
    }
}

async fn sessions(State(state): State<OpsState>) -> Json<SessionsReport> {
    Json(SessionsReport {
        active_sessions: state.server.sessions.active_count(),
        stored_orders: state.server.store.len(),
        shutting_down: state.server.sessions.is_shutting_down(),
    })
}

/// Serve the operator endpoint until `shutdown_rx` changes.
pub async fn serve_ops_endpoint(
    addr: SocketAddr,
    state: OpsState,
    mut shutdown_rx: watch::Receiver<bool>,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(address = %addr, "Serving metrics and readiness");

    axum::serve(listener, ops_router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.changed().await;
            tracing::debug!("Metrics endpoint stopping");
        })
        .await
}
