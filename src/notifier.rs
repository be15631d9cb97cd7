use std::sync::Arc;

use reqwest::Client;
use serde_json::json;

use crate::config::NotificationsConfig;
use crate::models::{Notification, NotificationStatus};
use crate::store::Store;
use crate::{AppError, Result};

/// Fire-and-forget alert delivery over a chat webhook. Failures are logged
/// and recorded on the notification row; nothing propagates to the caller.
pub struct NotificationDispatcher {
    client: Client,
    config: NotificationsConfig,
    store: Arc<dyn Store>,
}

impl NotificationDispatcher {
    pub fn new(config: NotificationsConfig, store: Arc<dyn Store>) -> Self {
        Self {
            client: Client::new(),
            config,
            store,
        }
    }

    pub async fn send(&self, notification: &Notification) {
        let status = match self.deliver(notification).await {
            Ok(()) => {
                tracing::info!(
                    notification_id = %notification.id,
                    "Delivered discrepancy alert"
                );
                NotificationStatus::Sent
            }
            Err(e) => {
                tracing::warn!(
                    notification_id = %notification.id,
                    "Alert delivery failed: {}",
                    e
                );
                NotificationStatus::Failed
            }
        };

        // Status bookkeeping is best-effort too
        if let Err(e) = self
            .store
            .set_notification_status(&notification.id, status)
            .await
        {
            tracing::warn!(
                notification_id = %notification.id,
                "Failed to record notification status: {}",
                e
            );
        }
    }

    async fn deliver(&self, notification: &Notification) -> Result<()> {
        let webhook_url = self.config.webhook_url.as_deref().ok_or_else(|| {
            AppError::Validation("no notification webhook configured".to_string())
        })?;

        let payload = json!({
            "username": self.config.username,
            "content": notification.message,
        });

        self.client
            .post(webhook_url)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}
