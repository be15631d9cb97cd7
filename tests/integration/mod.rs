use std::sync::Arc;

use pricewarden::config::{FetcherConfig, NotificationsConfig, ReconcilerConfig};
use pricewarden::models::{NewProduct, Product};
use pricewarden::store::{MemoryStore, Store};
use pricewarden::{
    NotificationDispatcher, PageFetcher, PriceExtractor, Reconciler, SyncProgressTracker,
};

pub mod progress_tests;
pub mod reconciliation_tests;
pub mod scheduler_tests;

/// Everything a test needs to drive reconciliation: the shared store, the
/// worker, and a progress tracker over the same store. The politeness delay
/// is zeroed so runs finish quickly.
pub struct TestHarness {
    pub store: Arc<MemoryStore>,
    pub reconciler: Reconciler,
    pub tracker: SyncProgressTracker,
}

impl TestHarness {
    pub fn new(webhook_url: Option<String>) -> Self {
        let store = Arc::new(MemoryStore::new());
        let store_dyn: Arc<dyn Store> = store.clone();

        let reconciler = Reconciler::new(
            Arc::clone(&store_dyn),
            PageFetcher::new(&FetcherConfig {
                request_timeout: 2,
                user_agent: "PriceWardenTest/0.1".to_string(),
            })
            .unwrap(),
            PriceExtractor::default(),
            NotificationDispatcher::new(
                NotificationsConfig {
                    webhook_url,
                    username: "PriceWarden".to_string(),
                },
                Arc::clone(&store_dyn),
            ),
            ReconcilerConfig {
                epsilon: 0.01,
                price_tolerance: 1e-6,
                politeness_delay_ms: 0,
            },
        );
        let tracker = SyncProgressTracker::new(store_dyn);

        Self {
            store,
            reconciler,
            tracker,
        }
    }

    pub async fn seed_product(
        &self,
        sku: &str,
        catalog_price: f64,
        supplier_url: Option<String>,
    ) -> Product {
        let product = Product::new(NewProduct {
            sku: sku.to_string(),
            title: format!("Product {}", sku),
            catalog_price,
            supplier_url,
        });
        self.store.insert_product(&product).await.unwrap();
        product
    }
}

/// A minimal supplier page carrying a single structured price annotation.
pub fn product_page(price: &str) -> String {
    format!(
        r#"<html><head>
            <meta property="og:price:amount" content="{}">
        </head><body><h1>Product</h1></body></html>"#,
        price
    )
}
