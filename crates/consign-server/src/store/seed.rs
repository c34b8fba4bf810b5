//! Seed data for the order store.
//!
//! The built-in sample set is loaded at startup unless disabled; operators can
//! also point the server at a JSON file holding an array of orders.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::proto::consign::v1::Order;

/// Error type for seed file loading.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse seed file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// On-disk representation of an order in a seed file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedOrder {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub items: Vec<String>,
    pub destination: String,
    #[serde(default)]
    pub price: f64,
}

impl From<SeedOrder> for Order {
    fn from(seed: SeedOrder) -> Self {
        Order {
            id: seed.id,
            items: seed.items,
            destination: seed.destination,
            price: seed.price,
        }
    }
}

/// The built-in sample orders.
pub fn sample_orders() -> Vec<Order> {
    let order = |id: &str, items: &[&str], destination: &str, price: f64| Order {
        id: id.to_string(),
        items: items.iter().map(ToString::to_string).collect(),
        destination: destination.to_string(),
        price,
    };

    vec![
        order(
            "102",
            &["Google Pixel 3A", "Mac Book Pro"],
            "Mountain View, CA",
            1800.00,
        ),
        order("103", &["Apple Watch S4"], "San Jose, CA", 400.00),
        order(
            "104",
            &["Google Home Mini", "Google Nest Hub"],
            "Mountain View, CA",
            400.00,
        ),
        order("105", &["Amazon Echo"], "San Jose, CA", 30.00),
        order(
            "106",
            &["Amazon Echo", "Apple iPhone XS"],
            "Mountain View, CA",
            300.00,
        ),
    ]
}

/// Load orders from a JSON seed file.
///
/// The file must contain a JSON array of `{id, items, destination, price}`
/// objects. Validation happens when the orders are written to the store.
pub fn load_seed_file<P: AsRef<Path>>(path: P) -> Result<Vec<Order>, SeedError> {
    let contents = fs::read_to_string(path)?;
    let seeds: Vec<SeedOrder> = serde_json::from_str(&contents)?;
    Ok(seeds.into_iter().map(Order::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_sample_orders_shape() {
        let orders = sample_orders();
        assert_eq!(orders.len(), 5);

        let mountain_view = orders
            .iter()
            .filter(|o| o.destination == "Mountain View, CA")
            .count();
        assert_eq!(mountain_view, 3);
    }

    #[test]
    fn test_load_seed_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"id": "a1", "items": ["Kettle"], "destination": "Leeds", "price": 25.5}},
                {{"destination": "York"}}
            ]"#
        )
        .unwrap();

        let orders = load_seed_file(file.path()).unwrap();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].id, "a1");
        assert_eq!(orders[0].items, vec!["Kettle"]);
        assert!(orders[1].id.is_empty());
        assert!(orders[1].items.is_empty());
        assert_eq!(orders[1].price, 0.0);
    }

    #[test]
    fn test_load_seed_file_rejects_bad_json() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();

        assert!(matches!(
            load_seed_file(file.path()),
            Err(SeedError::Parse(_))
        ));
    }

    #[test]
    fn test_load_seed_file_missing() {
        assert!(matches!(
            load_seed_file("/definitely/not/here.json"),
            Err(SeedError::Io(_))
        ));
    }
}
