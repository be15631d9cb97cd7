use std::time::Duration;

use reqwest::Client;

use crate::config::FetcherConfig;
use crate::Result;

/// HTTP retrieval of supplier product pages. Every request carries the
/// configured timeout; a hung remote is bounded by it and nothing else.
pub struct PageFetcher {
    client: Client,
}

impl PageFetcher {
    pub fn new(config: &FetcherConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { client })
    }

    pub async fn fetch(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}
