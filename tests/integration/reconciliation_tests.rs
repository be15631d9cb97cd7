use super::*;

use pricewarden::models::SyncStatus;
use pricewarden::PRICE_CHECK_JOB;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_page(server: &MockServer, route: &str, price: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(product_page(price)))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_run_survives_unreachable_supplier() {
    let server = MockServer::start().await;
    mount_page(&server, "/a", "10.00").await;
    mount_page(&server, "/b", "20.00").await;

    let harness = TestHarness::new(None);
    harness
        .seed_product("A", 10.00, Some(format!("{}/a", server.uri())))
        .await;
    harness
        .seed_product("B", 20.00, Some(format!("{}/b", server.uri())))
        .await;
    // Nothing listens on this port
    harness
        .seed_product("C", 30.00, Some("http://127.0.0.1:1/c".to_string()))
        .await;

    let summary = harness.reconciler.check_all_prices().await;

    assert_eq!(summary.checked, 3);
    assert_eq!(summary.updated, 2);
    assert!(summary.errors >= 1);
}

#[tokio::test]
async fn test_products_without_supplier_url_are_skipped() {
    let server = MockServer::start().await;
    mount_page(&server, "/a", "10.00").await;

    let harness = TestHarness::new(None);
    harness
        .seed_product("A", 10.00, Some(format!("{}/a", server.uri())))
        .await;
    harness.seed_product("B", 20.00, None).await;

    let summary = harness.reconciler.check_all_prices().await;
    assert_eq!(summary.checked, 1);
}

#[tokio::test]
async fn test_unparseable_page_counts_as_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/blank"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>sold out</body></html>"))
        .mount(&server)
        .await;

    let harness = TestHarness::new(None);
    harness
        .seed_product("A", 10.00, Some(format!("{}/blank", server.uri())))
        .await;

    let summary = harness.reconciler.check_all_prices().await;
    assert_eq!(summary.checked, 1);
    assert_eq!(summary.updated, 0);
    assert_eq!(summary.errors, 1);
}

#[tokio::test]
async fn test_discrepancy_flag_and_single_notification() {
    let server = MockServer::start().await;
    // catalog 100.00, supplier 100.02, epsilon 0.01: a discrepancy
    mount_page(&server, "/widget", "100.02").await;

    let webhook = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&webhook)
        .await;

    let harness = TestHarness::new(Some(format!("{}/hook", webhook.uri())));
    let product = harness
        .seed_product("WID-001", 100.00, Some(format!("{}/widget", server.uri())))
        .await;

    let first = harness.reconciler.check_all_prices().await;
    assert_eq!(first.checked, 1);
    assert_eq!(first.updated, 1);
    assert_eq!(first.errors, 0);

    let stored = harness.store.get_product(&product.id).await.unwrap().unwrap();
    assert!(stored.has_discrepancy);
    assert_eq!(stored.supplier_price, Some(100.02));
    assert!(stored.last_checked.is_some());

    let notifications = harness.store.notifications_for(&product.id).await.unwrap();
    assert_eq!(notifications.len(), 1);
    assert!(notifications[0].message.contains("WID-001"));

    // Second run sees the same supplier price: no update, no duplicate alert
    let second = harness.reconciler.check_all_prices().await;
    assert_eq!(second.checked, 1);
    assert_eq!(second.updated, 0);

    let notifications = harness.store.notifications_for(&product.id).await.unwrap();
    assert_eq!(notifications.len(), 1);

    let history = harness.store.price_history_for(&product.id).await.unwrap();
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn test_difference_within_epsilon_is_not_a_discrepancy() {
    let server = MockServer::start().await;
    mount_page(&server, "/widget", "100.01").await;

    let harness = TestHarness::new(None);
    let product = harness
        .seed_product("WID-001", 100.00, Some(format!("{}/widget", server.uri())))
        .await;

    let summary = harness.reconciler.check_all_prices().await;
    assert_eq!(summary.updated, 1);

    let stored = harness.store.get_product(&product.id).await.unwrap().unwrap();
    assert!(!stored.has_discrepancy);
    assert!(harness
        .store
        .notifications_for(&product.id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_price_change_appends_history_in_order() {
    let server = MockServer::start().await;
    mount_page(&server, "/widget", "90.00").await;

    let harness = TestHarness::new(None);
    let product = harness
        .seed_product("WID-001", 100.00, Some(format!("{}/widget", server.uri())))
        .await;

    harness.reconciler.check_all_prices().await;

    // The supplier changes the price between runs
    server.reset().await;
    mount_page(&server, "/widget", "95.00").await;

    harness.reconciler.check_all_prices().await;

    let history = harness.store.price_history_for(&product.id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].supplier_price, 90.00);
    assert_eq!(history[1].supplier_price, 95.00);
    assert!(history[0].recorded_at <= history[1].recorded_at);

    let stored = harness.store.get_product(&product.id).await.unwrap().unwrap();
    assert_eq!(stored.supplier_price, Some(95.00));
}

#[tokio::test]
async fn test_notification_only_on_transition_into_discrepancy() {
    let server = MockServer::start().await;
    mount_page(&server, "/widget", "90.00").await;

    let harness = TestHarness::new(None);
    let product = harness
        .seed_product("WID-001", 100.00, Some(format!("{}/widget", server.uri())))
        .await;

    harness.reconciler.check_all_prices().await;
    assert_eq!(
        harness.store.notifications_for(&product.id).await.unwrap().len(),
        1
    );

    // Still discrepant at a different price: updated, but no second alert
    server.reset().await;
    mount_page(&server, "/widget", "85.00").await;
    let summary = harness.reconciler.check_all_prices().await;
    assert_eq!(summary.updated, 1);
    assert_eq!(
        harness.store.notifications_for(&product.id).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn test_run_stats_accumulate_across_runs() {
    let server = MockServer::start().await;
    mount_page(&server, "/a", "10.00").await;
    mount_page(&server, "/b", "25.00").await;

    let harness = TestHarness::new(None);
    harness
        .seed_product("A", 10.00, Some(format!("{}/a", server.uri())))
        .await;
    harness
        .seed_product("B", 20.00, Some(format!("{}/b", server.uri())))
        .await;

    harness.reconciler.check_all_prices().await;
    harness.reconciler.check_all_prices().await;

    let stats = harness.store.run_stats().await.unwrap();
    assert_eq!(stats.total_checks, 4);
    assert_eq!(stats.total_discrepancies, 1); // B flagged once, on the first run
    assert!(stats.last_price_check.is_some());
}

#[tokio::test]
async fn test_run_tracked_records_completion() {
    let server = MockServer::start().await;
    mount_page(&server, "/a", "10.00").await;

    let harness = TestHarness::new(None);
    harness
        .seed_product("A", 10.00, Some(format!("{}/a", server.uri())))
        .await;
    harness
        .seed_product("C", 30.00, Some("http://127.0.0.1:1/c".to_string()))
        .await;

    let summary = harness.reconciler.run_tracked(&harness.tracker).await.unwrap();
    assert_eq!(summary.checked, 2);
    assert_eq!(summary.errors, 1);

    let progress = harness
        .tracker
        .get(PRICE_CHECK_JOB)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(progress.status, SyncStatus::Complete);
    assert_eq!(progress.total_items, 2);
    assert_eq!(progress.processed_items, 2);
    assert_eq!(progress.success_items, 1);
    assert_eq!(progress.failed_items, 1);
    assert_eq!(progress.percentage, 100.0);
    assert!(progress.completed_at.is_some());
    assert_eq!(
        progress.details().get("updated"),
        Some(&serde_json::json!(1))
    );
}

#[tokio::test]
async fn test_run_tracked_fails_when_progress_store_is_down() {
    let harness = TestHarness::new(None);
    harness.store.set_fail_sync_progress(true);

    let result = harness.reconciler.run_tracked(&harness.tracker).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_run_tracked_marks_batch_error_on_transition_failure() {
    let server = MockServer::start().await;
    mount_page(&server, "/a", "10.00").await;

    let harness = TestHarness::new(None);
    harness
        .seed_product("A", 10.00, Some(format!("{}/a", server.uri())))
        .await;

    // A progress transition write is rejected; the batch must surface as
    // failed and the record must carry an explanatory error status
    harness.store.fail_next_progress_update();
    let result = harness.reconciler.run_tracked(&harness.tracker).await;
    assert!(result.is_err());

    let progress = harness
        .tracker
        .get(PRICE_CHECK_JOB)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(progress.status, SyncStatus::Error);
    assert!(progress
        .message
        .as_deref()
        .unwrap()
        .contains("price check batch failed"));
}
