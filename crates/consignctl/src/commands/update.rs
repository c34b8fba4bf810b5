//! Update command implementation.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use consign_client::{ConnectConfig, ConsignClient, Order};
use serde::{Deserialize, Serialize};

use crate::OutputFormat;

/// One order as written in an update file.
#[derive(Debug, Deserialize)]
struct OrderInput {
    #[serde(default)]
    id: String,
    #[serde(default)]
    items: Vec<String>,
    destination: String,
    #[serde(default)]
    price: f64,
}

impl From<OrderInput> for Order {
    fn from(input: OrderInput) -> Self {
        Order {
            id: input.id,
            items: input.items,
            destination: input.destination,
            price: input.price,
        }
    }
}

#[derive(Serialize)]
struct UpdateOutput {
    order_ids: Vec<String>,
    summary: String,
}

/// Read a JSON array of orders.
fn read_orders(path: &Path) -> Result<Vec<Order>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read file: {}", path.display()))?;
    let inputs: Vec<OrderInput> = serde_json::from_str(&contents)
        .with_context(|| format!("invalid order file: {}", path.display()))?;
    Ok(inputs.into_iter().map(Order::from).collect())
}

pub async fn run(config: &ConnectConfig, file: &Path, format: OutputFormat) -> Result<()> {
    let orders = read_orders(file)?;

    let mut client = ConsignClient::connect(config)
        .await
        .context("failed to connect to server")?;

    let result = client.update_orders(orders).await?;

    match format {
        OutputFormat::Text => {
            println!("Updated {} order(s)", result.order_ids.len());
            println!("  {}", result.summary);
        }
        OutputFormat::Json => {
            let output = UpdateOutput {
                order_ids: result.order_ids,
                summary: result.summary,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
