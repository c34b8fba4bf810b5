//! Observability infrastructure.
//!
//! Provides:
//! - Structured tracing with optional OpenTelemetry export
//! - Prometheus metrics for sessions and shipments
//! - HTTP endpoints for Prometheus scraping

pub mod metrics;
pub mod prometheus;
pub mod tracing;
