use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{Notification, NotificationStatus, PriceHistory, Product, SyncProgress};
use crate::store::{RunStats, Store};
use crate::{AppError, Result};

#[derive(Default)]
struct Inner {
    products: Vec<Product>,
    history: Vec<PriceHistory>,
    progress: Vec<SyncProgress>,
    notifications: Vec<Notification>,
    stats: RunStats,
}

/// In-memory stand-in for the external persistence engine, used by the
/// integration suite. `fail_sync_progress` makes every sync-progress
/// operation return an error; `fail_next_progress_update` fails exactly one
/// upcoming progress write. Both exist to exercise the batch-failure paths.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    fail_sync_progress: AtomicBool,
    fail_next_progress_update: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_sync_progress(&self, enabled: bool) {
        self.fail_sync_progress.store(enabled, Ordering::SeqCst);
    }

    pub fn fail_next_progress_update(&self) {
        self.fail_next_progress_update.store(true, Ordering::SeqCst);
    }

    fn progress_guard(&self) -> Result<()> {
        if self.fail_sync_progress.load(Ordering::SeqCst) {
            Err(AppError::Internal(
                "sync progress store unavailable".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn reconcilable_products(&self) -> Result<Vec<Product>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .products
            .iter()
            .filter(|p| p.is_reconcilable())
            .cloned()
            .collect())
    }

    async fn get_product(&self, id: &str) -> Result<Option<Product>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.products.iter().find(|p| p.id == id).cloned())
    }

    async fn insert_product(&self, product: &Product) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        match inner.products.iter_mut().find(|p| p.id == product.id) {
            Some(existing) => *existing = product.clone(),
            None => inner.products.push(product.clone()),
        }
        Ok(())
    }

    async fn record_supplier_price(
        &self,
        id: &str,
        supplier_price: f64,
        has_discrepancy: bool,
        checked_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let product = inner
            .products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| AppError::NotFound {
                resource: format!("product:{}", id),
            })?;
        product.supplier_price = Some(supplier_price);
        product.has_discrepancy = has_discrepancy;
        product.last_checked = Some(checked_at);
        product.updated_at = checked_at;
        Ok(())
    }

    async fn touch_last_checked(&self, id: &str, checked_at: DateTime<Utc>) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let product = inner
            .products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| AppError::NotFound {
                resource: format!("product:{}", id),
            })?;
        product.last_checked = Some(checked_at);
        Ok(())
    }

    async fn append_price_history(&self, entry: &PriceHistory) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.history.push(entry.clone());
        Ok(())
    }

    async fn price_history_for(&self, product_id: &str) -> Result<Vec<PriceHistory>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .history
            .iter()
            .filter(|h| h.product_id == product_id)
            .cloned()
            .collect())
    }

    async fn latest_sync_progress(&self, job_type: &str) -> Result<Option<SyncProgress>> {
        self.progress_guard()?;
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .progress
            .iter()
            .rev()
            .find(|p| p.job_type == job_type)
            .cloned())
    }

    async fn active_sync_progress_count(&self, job_type: &str) -> Result<i64> {
        self.progress_guard()?;
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .progress
            .iter()
            .filter(|p| p.job_type == job_type && !p.is_terminal())
            .count() as i64)
    }

    async fn delete_active_sync_progress(&self, job_type: &str) -> Result<()> {
        self.progress_guard()?;
        let mut inner = self.inner.lock().unwrap();
        inner
            .progress
            .retain(|p| p.job_type != job_type || p.is_terminal());
        Ok(())
    }

    async fn insert_sync_progress(&self, record: &SyncProgress) -> Result<()> {
        self.progress_guard()?;
        let mut inner = self.inner.lock().unwrap();
        inner.progress.push(record.clone());
        Ok(())
    }

    async fn update_sync_progress(&self, record: &SyncProgress) -> Result<()> {
        self.progress_guard()?;
        if self.fail_next_progress_update.swap(false, Ordering::SeqCst) {
            return Err(AppError::Internal(
                "sync progress write rejected".to_string(),
            ));
        }
        let mut inner = self.inner.lock().unwrap();
        match inner.progress.iter_mut().find(|p| p.id == record.id) {
            Some(existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(AppError::NotFound {
                resource: format!("sync_progress:{}", record.id),
            }),
        }
    }

    async fn insert_notification(&self, notification: &Notification) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.notifications.push(notification.clone());
        Ok(())
    }

    async fn set_notification_status(&self, id: &str, status: NotificationStatus) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let notification = inner
            .notifications
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| AppError::NotFound {
                resource: format!("notification:{}", id),
            })?;
        notification.status = status;
        Ok(())
    }

    async fn notifications_for(&self, product_id: &str) -> Result<Vec<Notification>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .notifications
            .iter()
            .filter(|n| n.product_id == product_id)
            .cloned()
            .collect())
    }

    async fn run_stats(&self) -> Result<RunStats> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.stats.clone())
    }

    async fn record_run(
        &self,
        checked: i64,
        discrepancies: i64,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.stats.last_price_check = Some(at);
        inner.stats.total_checks += checked;
        inner.stats.total_discrepancies += discrepancies;
        Ok(())
    }
}
