use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::generate_id;

/// Append-only observation log: one row per observed supplier price change,
/// never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct PriceHistory {
    pub id: String,
    pub product_id: String,
    pub catalog_price: f64,
    pub supplier_price: f64,
    pub recorded_at: DateTime<Utc>,
}

impl PriceHistory {
    pub fn new(product_id: String, catalog_price: f64, supplier_price: f64) -> Self {
        Self {
            id: generate_id(),
            product_id,
            catalog_price,
            supplier_price,
            recorded_at: Utc::now(),
        }
    }
}
