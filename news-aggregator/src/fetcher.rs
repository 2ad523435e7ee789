//! Thin HTTP client used by the remote-refresh path.

use crate::types::{AggregatorError, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "news-aggregator/0.1".to_string(),
            timeout_seconds: 30,
        }
    }
}

#[derive(Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .build()
            .map_err(|e| AggregatorError::InvalidConfiguration(e.to_string()))?;
        Ok(Self { client })
    }

    /// Fetches the whole body of `url`, requiring a 200 response.
    pub async fn fetch_body(&self, url: &str) -> Result<Vec<u8>> {
        debug!(url, "fetching remote feed");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AggregatorError::RemoteFetch(e.to_string()))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(AggregatorError::RemoteFetch(format!(
                "unexpected status {} for {}",
                status, url
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AggregatorError::RemoteFetch(e.to_string()))?;
        info!(url, bytes = bytes.len(), "fetched remote feed");
        Ok(bytes.to_vec())
    }
}
