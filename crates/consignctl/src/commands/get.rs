//! Get command implementation.

use anyhow::{Context, Result};
use consign_client::{ConnectConfig, ConsignClient};

use super::{order_line, OrderOutput};
use crate::OutputFormat;

pub async fn run(config: &ConnectConfig, id: &str, format: OutputFormat) -> Result<()> {
    let mut client = ConsignClient::connect(config)
        .await
        .context("failed to connect to server")?;

    let order = client.get_order(id).await?;

    match format {
        OutputFormat::Text => println!("{}", order_line(&order)),
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&OrderOutput::from(order))?
            );
        }
    }

    Ok(())
}
