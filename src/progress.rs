use std::sync::Arc;

use tokio::sync::Mutex;

use crate::models::{ProgressPatch, SyncProgress};
use crate::store::Store;
use crate::Result;

/// State machine over persisted batch-progress records:
/// `pending → in-progress → {complete, error}`.
///
/// `update` reads the latest record before writing, so mutations for a
/// given type must be serialized; the internal mutex covers every
/// read-modify-write cycle and preserves caller order.
pub struct SyncProgressTracker {
    store: Arc<dyn Store>,
    lock: Mutex<()>,
}

impl SyncProgressTracker {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            lock: Mutex::new(()),
        }
    }

    /// Starts a fresh `pending` record for a job type. Any prior
    /// non-terminal record is deleted first, keeping at most one active
    /// record per type.
    pub async fn initialize(&self, job_type: &str) -> Result<SyncProgress> {
        let _guard = self.lock.lock().await;

        self.store.delete_active_sync_progress(job_type).await?;
        let record = SyncProgress::new(job_type);
        self.store.insert_sync_progress(&record).await?;

        tracing::debug!(job_type, "Initialized sync progress");
        Ok(record)
    }

    /// Applies a partial update over the most recent record for a job type.
    /// Returns `None` when no record exists (no-op, nothing is created).
    /// A terminal record is returned unchanged: finished runs are never
    /// reopened and `completed_at` never moves.
    pub async fn update(
        &self,
        job_type: &str,
        patch: ProgressPatch,
    ) -> Result<Option<SyncProgress>> {
        let _guard = self.lock.lock().await;

        let Some(mut record) = self.store.latest_sync_progress(job_type).await? else {
            tracing::debug!(job_type, "No sync progress record to update");
            return Ok(None);
        };

        if record.is_terminal() {
            tracing::debug!(job_type, "Ignoring update to terminal sync progress");
            return Ok(Some(record));
        }

        record.apply(patch);
        self.store.update_sync_progress(&record).await?;
        Ok(Some(record))
    }

    /// The most recent record for a job type, terminal or not.
    pub async fn get(&self, job_type: &str) -> Result<Option<SyncProgress>> {
        self.store.latest_sync_progress(job_type).await
    }
}
