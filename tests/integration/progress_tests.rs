use super::*;

use std::collections::HashMap;

use pricewarden::models::{ProgressPatch, SyncStatus};
use serde_json::json;

#[tokio::test]
async fn test_at_most_one_active_record_per_type() {
    let harness = TestHarness::new(None);

    harness.tracker.initialize("shopify-sync").await.unwrap();
    harness.tracker.initialize("shopify-sync").await.unwrap();

    let active = harness
        .store
        .active_sync_progress_count("shopify-sync")
        .await
        .unwrap();
    assert_eq!(active, 1);
}

#[tokio::test]
async fn test_types_track_independently() {
    let harness = TestHarness::new(None);

    harness.tracker.initialize("shopify-sync").await.unwrap();
    harness.tracker.initialize("price-check").await.unwrap();

    harness
        .tracker
        .update(
            "shopify-sync",
            ProgressPatch {
                status: Some(SyncStatus::InProgress),
                total_items: Some(10),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let shopify = harness.tracker.get("shopify-sync").await.unwrap().unwrap();
    let price_check = harness.tracker.get("price-check").await.unwrap().unwrap();

    assert_eq!(shopify.status, SyncStatus::InProgress);
    assert_eq!(price_check.status, SyncStatus::Pending);
}

#[tokio::test]
async fn test_completed_record_stays_finished() {
    let harness = TestHarness::new(None);

    harness.tracker.initialize("shopify-sync").await.unwrap();
    let completed = harness
        .tracker
        .update(
            "shopify-sync",
            ProgressPatch {
                status: Some(SyncStatus::Complete),
                processed_items: Some(5),
                total_items: Some(5),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    let completed_at = completed.completed_at;

    // Neither the status nor completed_at moves on a late update
    let after = harness
        .tracker
        .update(
            "shopify-sync",
            ProgressPatch {
                status: Some(SyncStatus::InProgress),
                details: Some(HashMap::from([("late".to_string(), json!(true))])),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(after.status, SyncStatus::Complete);
    assert_eq!(after.completed_at, completed_at);
    assert!(after.details().get("late").is_none());
}

#[tokio::test]
async fn test_update_unknown_type_returns_none() {
    let harness = TestHarness::new(None);

    let result = harness
        .tracker
        .update("never-started", ProgressPatch::default())
        .await
        .unwrap();
    assert!(result.is_none());
}
