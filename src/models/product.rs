use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::generate_id;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Product {
    pub id: String,
    pub sku: String,
    pub title: String,

    /// Price the merchant currently lists in the catalog.
    pub catalog_price: f64,

    // Supplier tracking
    pub supplier_url: Option<String>,
    pub supplier_price: Option<f64>,
    pub last_checked: Option<DateTime<Utc>>,
    pub has_discrepancy: bool,

    // Metadata
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub sku: String,
    pub title: String,
    pub catalog_price: f64,
    pub supplier_url: Option<String>,
}

impl Product {
    pub fn new(new_product: NewProduct) -> Self {
        let now = Utc::now();
        Self {
            id: generate_id(),
            sku: new_product.sku,
            title: new_product.title,
            catalog_price: new_product.catalog_price,
            supplier_url: new_product.supplier_url,
            supplier_price: None,
            last_checked: None,
            has_discrepancy: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Products without a supplier URL are skipped by reconciliation runs.
    pub fn is_reconcilable(&self) -> bool {
        self.supplier_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty())
    }

    /// Whether the observed supplier price matches the last observation.
    pub fn price_unchanged(&self, observed: f64, tolerance: f64) -> bool {
        match self.supplier_price {
            Some(previous) => (observed - previous).abs() <= tolerance,
            None => false,
        }
    }

    /// Whether a supplier price disagrees with the catalog beyond epsilon.
    pub fn is_discrepant(&self, supplier_price: f64, epsilon: f64) -> bool {
        (supplier_price - self.catalog_price).abs() > epsilon
    }
}
