use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub database: DatabaseConfig,
    pub fetcher: FetcherConfig,
    pub extractor: ExtractorConfig,
    pub reconciler: ReconcilerConfig,
    pub scheduler: SchedulerConfig,
    pub notifications: NotificationsConfig,
}

/// Merchant storefront the catalog belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub url: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetcherConfig {
    pub request_timeout: u64,
    pub user_agent: String,
}

/// Heuristic tuning for the price extractor. Confidence weights are
/// configuration because heuristic priority needs per-target-site tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    pub structured_meta_confidence: u8,
    pub platform_meta_confidence: u8,
    pub linked_data_confidence: u8,
    pub visible_element_confidence: u8,
    pub inline_script_confidence: u8,
    pub frequency_fallback_confidence: u8,
    /// Integers above this are treated as minor units (cents) on platforms
    /// known to encode them, and divided by 100.
    pub minor_unit_threshold: i64,
    /// Prioritized CSS hints for visible price fragments, first match wins.
    pub anchor_selectors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Catalog/supplier difference beyond this flags a discrepancy.
    pub epsilon: f64,
    /// Two supplier observations within this are the same price.
    pub price_tolerance: f64,
    pub politeness_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub check_interval_minutes: u64,
    pub daily_check_hour: u8,
    pub daily_check_minute: u8,
    pub utc_offset_hours: i8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    pub webhook_url: Option<String>,
    pub username: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:3000".to_string(),
            api_key: None,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 5,
            min_connections: 1,
            acquire_timeout: 30,
        }
    }
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            request_timeout: 30,
            user_agent: "PriceWarden/0.1".to_string(),
        }
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            structured_meta_confidence: 90,
            platform_meta_confidence: 85,
            linked_data_confidence: 80,
            visible_element_confidence: 75,
            inline_script_confidence: 70,
            frequency_fallback_confidence: 60,
            minor_unit_threshold: 1000,
            anchor_selectors: vec![
                ".price".to_string(),
                ".product-price".to_string(),
                ".price-current".to_string(),
                ".current-price".to_string(),
                ".sale-price".to_string(),
                ".amount".to_string(),
                "[data-price]".to_string(),
                "[itemprop=\"price\"]".to_string(),
                "[class*=\"price\"]".to_string(),
            ],
        }
    }
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            epsilon: 0.01,
            price_tolerance: 1e-6,
            politeness_delay_ms: 1000,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            check_interval_minutes: 360,
            daily_check_hour: 6,
            daily_check_minute: 0,
            utc_offset_hours: 0,
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            username: "PriceWarden".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            // Start with default configuration
            .add_source(File::with_name("config/default").required(false))
            // Add environment-specific config
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add local config (ignored by git)
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables with prefix "PRICEWARDEN_"
            .add_source(Environment::with_prefix("PRICEWARDEN").separator("__"))
            .build()?;

        let config: AppConfig = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if Url::parse(&self.store.url).is_err() {
            return Err(ConfigError::Message("Invalid store URL format".into()));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Message(
                "Database max_connections must be greater than 0".into(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Message(
                "Database min_connections cannot exceed max_connections".into(),
            ));
        }

        if self.fetcher.request_timeout == 0 {
            return Err(ConfigError::Message(
                "Fetcher request_timeout must be greater than 0".into(),
            ));
        }

        if self.extractor.minor_unit_threshold <= 0 {
            return Err(ConfigError::Message(
                "Extractor minor_unit_threshold must be greater than 0".into(),
            ));
        }

        if self.extractor.anchor_selectors.is_empty() {
            return Err(ConfigError::Message(
                "Extractor anchor_selectors must not be empty".into(),
            ));
        }

        if self.reconciler.epsilon <= 0.0 {
            return Err(ConfigError::Message(
                "Reconciler epsilon must be greater than 0".into(),
            ));
        }

        if self.reconciler.price_tolerance < 0.0 {
            return Err(ConfigError::Message(
                "Reconciler price_tolerance must not be negative".into(),
            ));
        }

        if self.scheduler.check_interval_minutes == 0 {
            return Err(ConfigError::Message(
                "Scheduler check_interval_minutes must be greater than 0".into(),
            ));
        }

        if self.scheduler.daily_check_hour > 23 {
            return Err(ConfigError::Message(
                "Scheduler daily_check_hour must be between 0 and 23".into(),
            ));
        }

        if self.scheduler.daily_check_minute > 59 {
            return Err(ConfigError::Message(
                "Scheduler daily_check_minute must be between 0 and 59".into(),
            ));
        }

        if !(-12..=14).contains(&self.scheduler.utc_offset_hours) {
            return Err(ConfigError::Message(
                "Scheduler utc_offset_hours must be between -12 and 14".into(),
            ));
        }

        if let Some(webhook_url) = &self.notifications.webhook_url {
            if Url::parse(webhook_url).is_err() {
                return Err(ConfigError::Message("Invalid webhook URL format".into()));
            }
        }

        Ok(())
    }
}
