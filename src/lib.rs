pub mod config;
pub mod extractor;
pub mod fetcher;
pub mod models;
pub mod notifier;
pub mod progress;
pub mod reconciler;
pub mod scheduler;
pub mod store;
pub mod utils;

// Re-export commonly used types
pub use config::AppConfig;
pub use extractor::{CandidateSource, PriceCandidate, PriceExtractor};
pub use fetcher::PageFetcher;
pub use notifier::NotificationDispatcher;
pub use progress::SyncProgressTracker;
pub use reconciler::{Reconciler, RunSummary, PRICE_CHECK_JOB};
pub use scheduler::{Scheduler, Task, Trigger};
pub use utils::error::AppError;

pub type Result<T> = std::result::Result<T, AppError>;
