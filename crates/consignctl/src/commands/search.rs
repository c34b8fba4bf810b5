//! Search command implementation.

use anyhow::{Context, Result};
use consign_client::{ConnectConfig, ConsignClient};

use super::{order_line, OrderOutput};
use crate::OutputFormat;

pub async fn run(config: &ConnectConfig, query: &str, format: OutputFormat) -> Result<()> {
    let mut client = ConsignClient::connect(config)
        .await
        .context("failed to connect to server")?;

    let orders = client.search_orders(query).await?;

    match format {
        OutputFormat::Text => {
            if orders.is_empty() {
                println!("No orders match '{query}'");
            } else {
                for order in &orders {
                    println!("{}", order_line(order));
                }
            }
        }
        OutputFormat::Json => {
            let output: Vec<OrderOutput> = orders.into_iter().map(OrderOutput::from).collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
