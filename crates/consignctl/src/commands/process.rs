//! Process command implementation.
//!
//! Sends order IDs through ProcessOrders while a background task prints
//! combined shipments as the server flushes them.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use consign_client::{CombinedShipment, ConnectConfig, ConsignClient};
use tokio::signal;

use super::ShipmentOutput;
use crate::OutputFormat;

fn print_shipment(shipment: CombinedShipment, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            let ids: Vec<&str> = shipment.order_list.iter().map(|o| o.id.as_str()).collect();
            println!(
                "{} [{}]: {} order(s): {}",
                shipment.id,
                shipment.status,
                ids.len(),
                ids.join(", ")
            );
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string(&ShipmentOutput::from(shipment))?);
        }
    }
    Ok(())
}

pub async fn run(
    config: &ConnectConfig,
    ids: Vec<String>,
    interval_ms: u64,
    format: OutputFormat,
) -> Result<()> {
    let mut client = ConsignClient::connect(config)
        .await
        .context("failed to connect to server")?;

    let (sender, mut receiver) = client.process_orders().await?.into_parts()?;

    let printer = tokio::spawn(async move {
        let mut received = 0usize;
        while let Some(shipment) = receiver.next_shipment().await? {
            received += 1;
            print_shipment(shipment, format)?;
        }
        Ok::<_, anyhow::Error>(received)
    });

    let interval = Duration::from_millis(interval_ms);
    let sending = async {
        for (i, id) in ids.iter().enumerate() {
            if i > 0 && !interval.is_zero() {
                tokio::time::sleep(interval).await;
            }
            tracing::debug!(order_id = %id, "Sending order");
            sender.send(id.as_str()).await?;
        }
        Ok::<_, anyhow::Error>(())
    };

    tokio::select! {
        _ = signal::ctrl_c() => {
            if format == OutputFormat::Text {
                eprintln!("\nInterrupted, closing stream");
            }
        }
        result = sending => {
            // A send error means the server ended the stream; the printer reports why
            if let Err(e) = result {
                tracing::debug!(error = %e, "Stopped sending");
            }
        }
    }

    // Closing the send side makes the server flush what it still holds
    drop(sender);

    let received = printer
        .await
        .map_err(|e| anyhow!("shipment printer failed: {e}"))??;

    if format == OutputFormat::Text {
        eprintln!("Received {received} shipment(s)");
    }

    Ok(())
}
