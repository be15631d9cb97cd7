use super::*;

use std::sync::Arc;
use std::time::Duration;

use pricewarden::models::SyncStatus;
use pricewarden::scheduler::{Scheduler, Task, Trigger};
use pricewarden::PRICE_CHECK_JOB;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_scheduled_reconciliation_runs_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/widget"))
        .respond_with(ResponseTemplate::new(200).set_body_string(product_page("42.00")))
        .mount(&server)
        .await;

    let harness = Arc::new(TestHarness::new(None));
    harness
        .seed_product("WID-001", 42.00, Some(format!("{}/widget", server.uri())))
        .await;

    let scheduler = Scheduler::new();
    let task_harness = Arc::clone(&harness);
    let task: Task = Arc::new(move || {
        let harness = Arc::clone(&task_harness);
        Box::pin(async move {
            harness.reconciler.run_tracked(&harness.tracker).await?;
            Ok(())
        })
    });

    // A long interval: only the immediate firing happens during the test
    scheduler
        .start_job(
            "price-check",
            Trigger::Interval {
                every: Duration::from_secs(3600),
            },
            task,
        )
        .await;

    // Wait for the immediate invocation to land
    let mut completed = false;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(50)).await;
        if let Some(progress) = harness.tracker.get(PRICE_CHECK_JOB).await.unwrap() {
            if progress.status == SyncStatus::Complete {
                completed = true;
                break;
            }
        }
    }
    scheduler.stop_all().await;

    assert!(completed, "scheduled run never completed");
    let stats = harness.store.run_stats().await.unwrap();
    assert_eq!(stats.total_checks, 1);
}

#[tokio::test]
async fn test_stop_all_clears_every_job() {
    let scheduler = Scheduler::new();
    let noop: Task = Arc::new(|| Box::pin(async { Ok(()) }));

    scheduler
        .start_job(
            "one",
            Trigger::Interval {
                every: Duration::from_secs(3600),
            },
            Arc::clone(&noop),
        )
        .await;
    scheduler
        .start_job(
            "two",
            Trigger::DailyAt {
                hour: 6,
                minute: 30,
                utc_offset_hours: 10,
            },
            noop,
        )
        .await;

    assert_eq!(scheduler.job_names().await.len(), 2);

    scheduler.stop_all().await;
    assert!(scheduler.job_names().await.is_empty());
    assert!(!scheduler.is_scheduled("one").await);
    assert!(!scheduler.is_scheduled("two").await);
}

#[tokio::test]
async fn test_trigger_is_inspectable() {
    let scheduler = Scheduler::new();
    let noop: Task = Arc::new(|| Box::pin(async { Ok(()) }));

    let trigger = Trigger::DailyAt {
        hour: 6,
        minute: 0,
        utc_offset_hours: 10,
    };
    scheduler.start_job("daily", trigger, noop).await;

    assert_eq!(scheduler.trigger_for("daily").await, Some(trigger));
    assert_eq!(scheduler.trigger_for("missing").await, None);

    scheduler.stop_all().await;
}
