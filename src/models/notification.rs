use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::{generate_id, NotificationStatus};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Notification {
    pub id: String,
    pub product_id: String,
    pub message: String,
    pub status: NotificationStatus,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(product_id: String, message: String) -> Self {
        Self {
            id: generate_id(),
            product_id,
            message,
            status: NotificationStatus::Pending,
            created_at: Utc::now(),
        }
    }

    /// Builds the standard discrepancy alert for a product.
    pub fn discrepancy(
        product_id: &str,
        sku: &str,
        catalog_price: f64,
        supplier_price: f64,
    ) -> Self {
        let message = format!(
            "Price discrepancy on {}: catalog {:.2}, supplier {:.2}",
            sku, catalog_price, supplier_price
        );
        Self::new(product_id.to_string(), message)
    }
}
