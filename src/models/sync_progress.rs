use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::{generate_id, SyncStatus};

/// Run-level status record for a long-running batch job. At most one
/// non-terminal record exists per job type at any time.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct SyncProgress {
    pub id: String,
    pub job_type: String,
    pub status: SyncStatus,
    pub total_items: i64,
    pub processed_items: i64,
    pub success_items: i64,
    pub failed_items: i64,
    pub percentage: f64,
    pub details_json: String,
    pub message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Partial update applied over the most recent record for a job type.
/// Absent fields keep their existing values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgressPatch {
    pub status: Option<SyncStatus>,
    pub total_items: Option<i64>,
    pub processed_items: Option<i64>,
    pub success_items: Option<i64>,
    pub failed_items: Option<i64>,
    pub details: Option<HashMap<String, serde_json::Value>>,
    pub message: Option<String>,
}

impl SyncProgress {
    pub fn new(job_type: &str) -> Self {
        Self {
            id: generate_id(),
            job_type: job_type.to_string(),
            status: SyncStatus::Pending,
            total_items: 0,
            processed_items: 0,
            success_items: 0,
            failed_items: 0,
            percentage: 0.0,
            details_json: "{}".to_string(),
            message: None,
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn details(&self) -> HashMap<String, serde_json::Value> {
        serde_json::from_str(&self.details_json).unwrap_or_default()
    }

    /// Applies a patch in place. Existing values back any field the patch
    /// leaves out; `details` keys merge over the existing map instead of
    /// replacing it. Terminal records must not be patched (the tracker
    /// enforces this before calling).
    pub fn apply(&mut self, patch: ProgressPatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(total) = patch.total_items {
            self.total_items = total;
        }
        if let Some(processed) = patch.processed_items {
            self.processed_items = processed;
        }
        if let Some(success) = patch.success_items {
            self.success_items = success;
        }
        if let Some(failed) = patch.failed_items {
            self.failed_items = failed;
        }
        if let Some(message) = patch.message {
            self.message = Some(message);
        }

        if let Some(new_details) = patch.details {
            let mut merged = self.details();
            merged.extend(new_details);
            // Serializing a String-keyed map cannot fail
            self.details_json =
                serde_json::to_string(&merged).unwrap_or_else(|_| "{}".to_string());
        }

        if self.total_items > 0 {
            self.percentage = self.processed_items as f64 / self.total_items as f64 * 100.0;
        }

        if self.status.is_terminal() && self.completed_at.is_none() {
            self.completed_at = Some(Utc::now());
        }
    }
}
