use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod notification;
pub mod price_history;
pub mod product;
pub mod sync_progress;

// Re-exports for convenience
pub use notification::*;
pub use price_history::*;
pub use product::*;
pub use sync_progress::*;

// Common enums used across models
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(type_name = "TEXT")]
pub enum SyncStatus {
    #[sqlx(rename = "pending")]
    Pending,
    #[sqlx(rename = "in-progress")]
    InProgress,
    #[sqlx(rename = "complete")]
    Complete,
    #[sqlx(rename = "error")]
    Error,
}

impl SyncStatus {
    /// Complete and error records are immutable; pending and in-progress are live.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncStatus::Complete | SyncStatus::Error)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "TEXT")]
pub enum NotificationStatus {
    #[sqlx(rename = "pending")]
    Pending,
    #[sqlx(rename = "sent")]
    Sent,
    #[sqlx(rename = "failed")]
    Failed,
}

// Helper function to generate UUIDs in the format expected by the database
pub fn generate_id() -> String {
    Uuid::new_v4().simple().to_string()
}
