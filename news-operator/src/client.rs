//! HTTP surfaces of the aggregator, behind traits so reconciler tests
//! run against in-process fakes.

use crate::types::{OperatorError, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// Source-registry surface (`/sources`) of the aggregator.
#[async_trait]
pub trait RegistryApi: Send + Sync {
    async fn create_source(&self, name: &str, link: &str) -> Result<()>;
    async fn update_source(&self, name: &str, link: &str) -> Result<()>;
    async fn delete_source(&self, name: &str) -> Result<()>;
}

/// Projection surface (`/news`) of the aggregator.
#[async_trait]
pub trait NewsApi: Send + Sync {
    /// Fetches the article titles behind a fully formed `/news` URL.
    async fn fetch_titles(&self, url: &str) -> Result<Vec<String>>;
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
    /// The reference wiring accepts self-signed certificates.
    pub accept_invalid_certs: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://localhost:8443".to_string(),
            timeout_seconds: 5,
            accept_invalid_certs: false,
        }
    }
}

pub struct AggregatorClient {
    base_url: String,
    client: reqwest::Client,
}

impl AggregatorClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn sources_url(&self) -> String {
        format!("{}/sources", self.base_url)
    }

    async fn expect_status(response: reqwest::Response, expected: StatusCode) -> Result<()> {
        let status = response.status();
        if status == expected {
            return Ok(());
        }
        let detail = response.text().await.unwrap_or_default();
        Err(OperatorError::Registry {
            status: status.as_u16(),
            detail,
        })
    }
}

#[async_trait]
impl RegistryApi for AggregatorClient {
    async fn create_source(&self, name: &str, link: &str) -> Result<()> {
        debug!(name, "registering source");
        let response = self
            .client
            .post(self.sources_url())
            .json(&json!({"name": name, "url": link, "format": "RSS"}))
            .send()
            .await?;
        Self::expect_status(response, StatusCode::CREATED).await
    }

    async fn update_source(&self, name: &str, link: &str) -> Result<()> {
        debug!(name, "updating source");
        let response = self
            .client
            .put(self.sources_url())
            .json(&json!({"name": name, "url": link, "format": "RSS"}))
            .send()
            .await?;
        Self::expect_status(response, StatusCode::OK).await
    }

    async fn delete_source(&self, name: &str) -> Result<()> {
        debug!(name, "deleting source");
        let response = self
            .client
            .delete(self.sources_url())
            .json(&json!({"name": name}))
            .send()
            .await?;
        Self::expect_status(response, StatusCode::OK).await
    }
}

#[derive(Debug, Deserialize)]
struct TitleOnly {
    title: String,
}

#[async_trait]
impl NewsApi for AggregatorClient {
    async fn fetch_titles(&self, url: &str) -> Result<Vec<String>> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            let detail = response.text().await.unwrap_or_default();
            return Err(OperatorError::Registry {
                status: status.as_u16(),
                detail,
            });
        }
        let articles: Vec<TitleOnly> = response.json().await?;
        Ok(articles.into_iter().map(|a| a.title).collect())
    }
}
