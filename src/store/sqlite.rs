use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use crate::config::DatabaseConfig;
use crate::models::{Notification, NotificationStatus, PriceHistory, Product, SyncProgress};
use crate::store::{RunStats, Store};
use crate::Result;

const RUN_STATS_KEY: &str = "run_stats";

/// sqlx-backed store. Tables are owned and migrated by the surrounding
/// service; every query here is a plain runtime statement.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout))
            .connect(&config.url)
            .await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn reconcilable_products(&self) -> Result<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"SELECT * FROM products
               WHERE supplier_url IS NOT NULL AND TRIM(supplier_url) != ''
               ORDER BY sku"#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    async fn get_product(&self, id: &str) -> Result<Option<Product>> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    async fn insert_product(&self, product: &Product) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO products
               (id, sku, title, catalog_price, supplier_url, supplier_price,
                last_checked, has_discrepancy, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(id) DO UPDATE SET
                 sku = excluded.sku,
                 title = excluded.title,
                 catalog_price = excluded.catalog_price,
                 supplier_url = excluded.supplier_url,
                 updated_at = excluded.updated_at"#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.title)
        .bind(product.catalog_price)
        .bind(&product.supplier_url)
        .bind(product.supplier_price)
        .bind(product.last_checked)
        .bind(product.has_discrepancy)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn record_supplier_price(
        &self,
        id: &str,
        supplier_price: f64,
        has_discrepancy: bool,
        checked_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"UPDATE products
               SET supplier_price = ?, has_discrepancy = ?, last_checked = ?, updated_at = ?
               WHERE id = ?"#,
        )
        .bind(supplier_price)
        .bind(has_discrepancy)
        .bind(checked_at)
        .bind(checked_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn touch_last_checked(&self, id: &str, checked_at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE products SET last_checked = ? WHERE id = ?")
            .bind(checked_at)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn append_price_history(&self, entry: &PriceHistory) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO price_history
               (id, product_id, catalog_price, supplier_price, recorded_at)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(&entry.id)
        .bind(&entry.product_id)
        .bind(entry.catalog_price)
        .bind(entry.supplier_price)
        .bind(entry.recorded_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn price_history_for(&self, product_id: &str) -> Result<Vec<PriceHistory>> {
        let entries = sqlx::query_as::<_, PriceHistory>(
            "SELECT * FROM price_history WHERE product_id = ? ORDER BY recorded_at",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    async fn latest_sync_progress(&self, job_type: &str) -> Result<Option<SyncProgress>> {
        let record = sqlx::query_as::<_, SyncProgress>(
            "SELECT * FROM sync_progress WHERE job_type = ? ORDER BY started_at DESC LIMIT 1",
        )
        .bind(job_type)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn active_sync_progress_count(&self, job_type: &str) -> Result<i64> {
        let count: (i64,) = sqlx::query_as(
            r#"SELECT COUNT(*) FROM sync_progress
               WHERE job_type = ? AND status IN ('pending', 'in-progress')"#,
        )
        .bind(job_type)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0)
    }

    async fn delete_active_sync_progress(&self, job_type: &str) -> Result<()> {
        sqlx::query(
            r#"DELETE FROM sync_progress
               WHERE job_type = ? AND status IN ('pending', 'in-progress')"#,
        )
        .bind(job_type)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_sync_progress(&self, record: &SyncProgress) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO sync_progress
               (id, job_type, status, total_items, processed_items, success_items,
                failed_items, percentage, details_json, message, started_at, completed_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&record.id)
        .bind(&record.job_type)
        .bind(record.status)
        .bind(record.total_items)
        .bind(record.processed_items)
        .bind(record.success_items)
        .bind(record.failed_items)
        .bind(record.percentage)
        .bind(&record.details_json)
        .bind(&record.message)
        .bind(record.started_at)
        .bind(record.completed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_sync_progress(&self, record: &SyncProgress) -> Result<()> {
        sqlx::query(
            r#"UPDATE sync_progress
               SET status = ?, total_items = ?, processed_items = ?, success_items = ?,
                   failed_items = ?, percentage = ?, details_json = ?, message = ?,
                   completed_at = ?
               WHERE id = ?"#,
        )
        .bind(record.status)
        .bind(record.total_items)
        .bind(record.processed_items)
        .bind(record.success_items)
        .bind(record.failed_items)
        .bind(record.percentage)
        .bind(&record.details_json)
        .bind(&record.message)
        .bind(record.completed_at)
        .bind(&record.id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_notification(&self, notification: &Notification) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO notifications (id, product_id, message, status, created_at)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(&notification.id)
        .bind(&notification.product_id)
        .bind(&notification.message)
        .bind(notification.status)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_notification_status(&self, id: &str, status: NotificationStatus) -> Result<()> {
        sqlx::query("UPDATE notifications SET status = ? WHERE id = ?")
            .bind(status)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn notifications_for(&self, product_id: &str) -> Result<Vec<Notification>> {
        let notifications = sqlx::query_as::<_, Notification>(
            "SELECT * FROM notifications WHERE product_id = ? ORDER BY created_at",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(notifications)
    }

    async fn run_stats(&self) -> Result<RunStats> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT value FROM settings WHERE key = ?")
                .bind(RUN_STATS_KEY)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some((value,)) => Ok(serde_json::from_str(&value)?),
            None => Ok(RunStats::default()),
        }
    }

    async fn record_run(
        &self,
        checked: i64,
        discrepancies: i64,
        at: DateTime<Utc>,
    ) -> Result<()> {
        // Read-modify-write inside one transaction keeps the counters atomic
        // under overlapping runs.
        let mut tx = self.pool.begin().await?;

        let row: Option<(String,)> =
            sqlx::query_as("SELECT value FROM settings WHERE key = ?")
                .bind(RUN_STATS_KEY)
                .fetch_optional(&mut *tx)
                .await?;

        let mut stats = match row {
            Some((value,)) => serde_json::from_str::<RunStats>(&value).unwrap_or_default(),
            None => RunStats::default(),
        };
        stats.last_price_check = Some(at);
        stats.total_checks += checked;
        stats.total_discrepancies += discrepancies;

        sqlx::query(
            r#"INSERT INTO settings (key, value) VALUES (?, ?)
               ON CONFLICT(key) DO UPDATE SET value = excluded.value"#,
        )
        .bind(RUN_STATS_KEY)
        .bind(serde_json::to_string(&stats)?)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}
