//! Connection handling for the Consign client.

use anyhow::{Context, Result};
use futures::StreamExt;
use std::path::PathBuf;
use thiserror::Error;
use tonic::transport::{Certificate, Channel, ClientTlsConfig, Endpoint};

use consign_proto::consign::v1::order_management_client::OrderManagementClient;
use consign_proto::consign::v1::{Order, OrderId, SearchQuery};

use crate::ops::UpdateResult;
use crate::shipments::ShipmentSession;

/// Error type for endpoint configuration.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("endpoint must start with http:// or https://")]
    InvalidScheme,

    #[error("TLS flags are only valid with an https:// endpoint")]
    TlsWithoutHttps,

    #[error("--tls-ca is required for https:// endpoints")]
    MissingCa,

    #[error("failed to read tls ca file {path}: {source}")]
    ReadCa {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid endpoint: {0}")]
    Endpoint(#[from] tonic::transport::Error),
}

/// Where and how to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectConfig {
    /// Server URL, `http://` or `https://`.
    pub endpoint: String,
    /// CA certificate (PEM) used to verify an `https://` server.
    pub tls_ca: Option<PathBuf>,
    /// Override for the TLS server name.
    pub tls_domain: Option<String>,
}

impl ConnectConfig {
    /// Plain configuration for `endpoint`, without TLS settings.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            tls_ca: None,
            tls_domain: None,
        }
    }

    /// Build the transport endpoint, reading the CA certificate if needed.
    pub fn endpoint(&self) -> Result<Endpoint, ConnectError> {
        let is_https = self.endpoint.starts_with("https://");
        let is_http = self.endpoint.starts_with("http://");
        if !is_https && !is_http {
            return Err(ConnectError::InvalidScheme);
        }

        if is_http {
            if self.tls_ca.is_some() || self.tls_domain.is_some() {
                return Err(ConnectError::TlsWithoutHttps);
            }
            return Ok(Endpoint::from_shared(self.endpoint.clone())?);
        }

        let tls_ca = self.tls_ca.as_ref().ok_or(ConnectError::MissingCa)?;
        let ca_pem = std::fs::read(tls_ca).map_err(|source| ConnectError::ReadCa {
            path: tls_ca.clone(),
            source,
        })?;

        let mut tls = ClientTlsConfig::new().ca_certificate(Certificate::from_pem(ca_pem));
        if let Some(domain) = &self.tls_domain {
            tls = tls.domain_name(domain.clone());
        }

        Ok(Endpoint::from_shared(self.endpoint.clone())?.tls_config(tls)?)
    }
}

/// Async client for the OrderManagement service.
#[derive(Debug, Clone)]
pub struct ConsignClient {
    inner: OrderManagementClient<Channel>,
}

impl ConsignClient {
    /// Connect to a Consign server.
    pub async fn connect(config: &ConnectConfig) -> Result<Self> {
        let channel = config
            .endpoint()?
            .connect()
            .await
            .with_context(|| format!("failed to connect to {}", config.endpoint))?;

        tracing::debug!(endpoint = %config.endpoint, "Connected");
        Ok(Self {
            inner: OrderManagementClient::new(channel),
        })
    }

    /// Store a new order and return its server-assigned ID.
    pub async fn add_order(&mut self, order: Order) -> Result<String> {
        let id = self
            .inner
            .add_order(order)
            .await
            .context("add_order failed")?
            .into_inner();
        Ok(id.value)
    }

    /// Fetch one order by ID.
    pub async fn get_order(&mut self, order_id: &str) -> Result<Order> {
        let order = self
            .inner
            .get_order(OrderId {
                value: order_id.to_string(),
            })
            .await
            .with_context(|| format!("get_order {order_id} failed"))?
            .into_inner();
        Ok(order)
    }

    /// Collect every order with an item containing `query`.
    pub async fn search_orders(&mut self, query: &str) -> Result<Vec<Order>> {
        let mut stream = self
            .inner
            .search_orders(SearchQuery {
                value: query.to_string(),
            })
            .await
            .context("search_orders failed")?
            .into_inner();

        let mut orders = Vec::new();
        while let Some(order) = stream.next().await {
            orders.push(order.context("search stream failed")?);
        }
        Ok(orders)
    }

    /// Replace orders by ID, streaming them to the server.
    pub async fn update_orders(&mut self, orders: Vec<Order>) -> Result<UpdateResult> {
        let response = self
            .inner
            .update_orders(futures::stream::iter(orders))
            .await
            .context("update_orders failed")?
            .into_inner();
        Ok(response.into())
    }

    /// Open a ProcessOrders session.
    pub async fn process_orders(&mut self) -> Result<ShipmentSession> {
        ShipmentSession::start(&mut self.inner).await
    }
}
