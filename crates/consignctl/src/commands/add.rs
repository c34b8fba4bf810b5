//! Add command implementation.

use anyhow::{Context, Result};
use consign_client::{ConnectConfig, ConsignClient, Order};
use serde::Serialize;

use crate::OutputFormat;

#[derive(Serialize)]
struct AddOutput {
    order_id: String,
    destination: String,
    items: usize,
}

pub async fn run(
    config: &ConnectConfig,
    destination: String,
    price: f64,
    items: Vec<String>,
    format: OutputFormat,
) -> Result<()> {
    let mut client = ConsignClient::connect(config)
        .await
        .context("failed to connect to server")?;

    let item_count = items.len();
    let order_id = client
        .add_order(Order {
            id: String::new(),
            items,
            destination: destination.clone(),
            price,
        })
        .await?;

    let output = AddOutput {
        order_id,
        destination,
        items: item_count,
    };

    match format {
        OutputFormat::Text => {
            println!("Added order for '{}'", output.destination);
            println!("  Order ID: {}", output.order_id);
            println!("  Items: {}", output.items);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
