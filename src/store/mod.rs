use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Notification, NotificationStatus, PriceHistory, Product, SyncProgress};
use crate::Result;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Cumulative reconciliation counters, updated atomically at the end of
/// each run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RunStats {
    pub last_price_check: Option<DateTime<Utc>>,
    pub total_checks: i64,
    pub total_discrepancies: i64,
}

/// Persistence boundary for the reconciliation core. Schema and migrations
/// belong to the owning service; this crate only reads and writes records.
///
/// Writes are upserts or appends so overlapping runs stay correct; only
/// sync-progress mutation relies on external serialization (the tracker
/// holds a mutex across its read-modify-write).
#[async_trait]
pub trait Store: Send + Sync {
    // Products
    async fn reconcilable_products(&self) -> Result<Vec<Product>>;
    async fn get_product(&self, id: &str) -> Result<Option<Product>>;
    async fn insert_product(&self, product: &Product) -> Result<()>;
    /// Persists a new supplier observation and the recomputed discrepancy
    /// flag in one write.
    async fn record_supplier_price(
        &self,
        id: &str,
        supplier_price: f64,
        has_discrepancy: bool,
        checked_at: DateTime<Utc>,
    ) -> Result<()>;
    async fn touch_last_checked(&self, id: &str, checked_at: DateTime<Utc>) -> Result<()>;

    // Price history (append-only, never updated or deleted)
    async fn append_price_history(&self, entry: &PriceHistory) -> Result<()>;
    async fn price_history_for(&self, product_id: &str) -> Result<Vec<PriceHistory>>;

    // Sync progress
    async fn latest_sync_progress(&self, job_type: &str) -> Result<Option<SyncProgress>>;
    async fn active_sync_progress_count(&self, job_type: &str) -> Result<i64>;
    async fn delete_active_sync_progress(&self, job_type: &str) -> Result<()>;
    async fn insert_sync_progress(&self, record: &SyncProgress) -> Result<()>;
    async fn update_sync_progress(&self, record: &SyncProgress) -> Result<()>;

    // Notifications
    async fn insert_notification(&self, notification: &Notification) -> Result<()>;
    async fn set_notification_status(&self, id: &str, status: NotificationStatus) -> Result<()>;
    async fn notifications_for(&self, product_id: &str) -> Result<Vec<Notification>>;

    // Aggregate stats
    async fn run_stats(&self) -> Result<RunStats>;
    async fn record_run(&self, checked: i64, discrepancies: i64, at: DateTime<Utc>)
        -> Result<()>;
}
