use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::ReconcilerConfig;
use crate::extractor::PriceExtractor;
use crate::fetcher::PageFetcher;
use crate::models::{Notification, PriceHistory, ProgressPatch, Product, SyncStatus};
use crate::notifier::NotificationDispatcher;
use crate::progress::SyncProgressTracker;
use crate::store::Store;
use crate::{AppError, Result};

/// Job type under which scheduled reconciliation runs report progress.
pub const PRICE_CHECK_JOB: &str = "price-check";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunSummary {
    pub checked: usize,
    pub updated: usize,
    pub errors: usize,
}

struct CheckOutcome {
    updated: bool,
    new_discrepancy: bool,
}

/// Drives one reconciliation pass over every product with a supplier URL:
/// fetch the supplier page, extract a price, compare against catalog state,
/// persist, and alert on newly-detected discrepancies.
pub struct Reconciler {
    store: Arc<dyn Store>,
    fetcher: PageFetcher,
    extractor: PriceExtractor,
    dispatcher: NotificationDispatcher,
    config: ReconcilerConfig,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn Store>,
        fetcher: PageFetcher,
        extractor: PriceExtractor,
        dispatcher: NotificationDispatcher,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            store,
            fetcher,
            extractor,
            dispatcher,
            config,
        }
    }

    /// One complete pass. Products are processed sequentially with a
    /// politeness delay between supplier requests; no single product's
    /// failure ever aborts the run, and a summary is always returned.
    pub async fn check_all_prices(&self) -> RunSummary {
        let products = match self.store.reconcilable_products().await {
            Ok(products) => products,
            Err(e) => {
                tracing::error!("Could not load products for reconciliation: {}", e);
                return RunSummary::default();
            }
        };

        tracing::info!("Starting price check over {} products", products.len());

        let mut summary = RunSummary::default();
        let mut new_discrepancies = 0i64;
        let total = products.len();

        for (index, product) in products.iter().enumerate() {
            summary.checked += 1;

            match self.check_product(product).await {
                Ok(outcome) => {
                    if outcome.updated {
                        summary.updated += 1;
                    }
                    if outcome.new_discrepancy {
                        new_discrepancies += 1;
                    }
                }
                Err(e) => {
                    tracing::warn!(sku = %product.sku, "Price check failed: {}", e);
                    summary.errors += 1;
                }
            }

            if index + 1 < total {
                tokio::time::sleep(Duration::from_millis(self.config.politeness_delay_ms)).await;
            }
        }

        if let Err(e) = self
            .store
            .record_run(summary.checked as i64, new_discrepancies, Utc::now())
            .await
        {
            tracing::error!("Failed to record run stats: {}", e);
        }

        tracing::info!(
            checked = summary.checked,
            updated = summary.updated,
            errors = summary.errors,
            "Price check finished"
        );
        summary
    }

    /// Scheduled batch entry point: a run wrapped in run-level progress
    /// tracking. Progress persistence is the authoritative external-facing
    /// status, so a failure transitioning it fails the whole batch — the
    /// only early exit the worker has.
    pub async fn run_tracked(&self, tracker: &SyncProgressTracker) -> Result<RunSummary> {
        tracker.initialize(PRICE_CHECK_JOB).await?;

        let total = self
            .store
            .reconcilable_products()
            .await
            .map(|products| products.len() as i64)
            .unwrap_or(0);

        if let Err(e) = tracker
            .update(
                PRICE_CHECK_JOB,
                ProgressPatch {
                    status: Some(SyncStatus::InProgress),
                    total_items: Some(total),
                    ..Default::default()
                },
            )
            .await
        {
            self.mark_batch_failed(tracker, &e).await;
            return Err(e);
        }

        let summary = self.check_all_prices().await;

        let completion = ProgressPatch {
            status: Some(SyncStatus::Complete),
            processed_items: Some(summary.checked as i64),
            success_items: Some((summary.checked - summary.errors) as i64),
            failed_items: Some(summary.errors as i64),
            details: Some(HashMap::from([(
                "updated".to_string(),
                json!(summary.updated),
            )])),
            ..Default::default()
        };

        if let Err(e) = tracker.update(PRICE_CHECK_JOB, completion).await {
            self.mark_batch_failed(tracker, &e).await;
            return Err(e);
        }

        Ok(summary)
    }

    async fn mark_batch_failed(&self, tracker: &SyncProgressTracker, cause: &AppError) {
        let patch = ProgressPatch {
            status: Some(SyncStatus::Error),
            message: Some(format!("price check batch failed: {}", cause)),
            ..Default::default()
        };
        if let Err(e) = tracker.update(PRICE_CHECK_JOB, patch).await {
            tracing::error!("Could not record batch failure: {}", e);
        }
    }

    async fn check_product(&self, product: &Product) -> Result<CheckOutcome> {
        let url = product.supplier_url.as_deref().unwrap_or_default();

        let html = self.fetcher.fetch(url).await?;
        let candidate = self
            .extractor
            .extract(&html, url)
            .ok_or_else(|| AppError::Extraction {
                url: url.to_string(),
            })?;
        let observed = candidate.value.to_f64().ok_or_else(|| AppError::Parse {
            message: format!("price {} out of range", candidate.value),
        })?;

        tracing::debug!(
            sku = %product.sku,
            price = observed,
            source = candidate.source.as_str(),
            confidence = candidate.confidence,
            "Extracted supplier price"
        );

        let now = Utc::now();

        if product.price_unchanged(observed, self.config.price_tolerance) {
            self.store.touch_last_checked(&product.id, now).await?;
            return Ok(CheckOutcome {
                updated: false,
                new_discrepancy: false,
            });
        }

        let has_discrepancy = product.is_discrepant(observed, self.config.epsilon);
        self.store
            .record_supplier_price(&product.id, observed, has_discrepancy, now)
            .await?;
        self.store
            .append_price_history(&PriceHistory::new(
                product.id.clone(),
                product.catalog_price,
                observed,
            ))
            .await?;

        // Alert only on the transition into discrepancy, not on every run
        // that still sees one
        let new_discrepancy = has_discrepancy && !product.has_discrepancy;
        if new_discrepancy {
            tracing::info!(
                sku = %product.sku,
                catalog = product.catalog_price,
                supplier = observed,
                "Price discrepancy detected"
            );
            let notification = Notification::discrepancy(
                &product.id,
                &product.sku,
                product.catalog_price,
                observed,
            );
            match self.store.insert_notification(&notification).await {
                Ok(()) => self.dispatcher.send(&notification).await,
                Err(e) => {
                    tracing::warn!(sku = %product.sku, "Failed to persist notification: {}", e);
                }
            }
        }

        Ok(CheckOutcome {
            updated: true,
            new_discrepancy,
        })
    }
}
