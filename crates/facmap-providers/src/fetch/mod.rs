//! Raw transport: anything that turns a [`FetchRequest`] into a JSON body.

mod cache;
#[cfg(any(test, feature = "test-util"))]
mod canned;

use std::time::Duration;

use async_trait::async_trait;
use facmap_core::{AppConfig, FetchCacheMode};
use reqwest::header::ACCEPT;
use reqwest::Client;

use crate::error::ProviderError;

pub use cache::CachingFetcher;
#[cfg(any(test, feature = "test-util"))]
pub use canned::StaticFetcher;

/// One raw provider request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    /// Stable name of this request, used as the cache file stem.
    pub cache_key: String,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>, cache_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            cache_key: cache_key.into(),
        }
    }
}

/// Obtains the parsed JSON body for a request.
#[async_trait]
pub trait RawFetcher: Send + Sync {
    /// # Errors
    ///
    /// Returns [`ProviderError`] on transport, status, or decode failures.
    async fn fetch(&self, request: &FetchRequest) -> Result<serde_json::Value, ProviderError>;
}

#[async_trait]
impl<T: RawFetcher + ?Sized> RawFetcher for Box<T> {
    async fn fetch(&self, request: &FetchRequest) -> Result<serde_json::Value, ProviderError> {
        (**self).fetch(request).await
    }
}

/// Plain HTTP GET against the provider endpoints. No retries.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// # Errors
    ///
    /// Returns [`ProviderError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl RawFetcher for HttpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<serde_json::Value, ProviderError> {
        tracing::debug!(url = %request.url, cache_key = %request.cache_key, "fetching provider data");

        let response = self
            .client
            .get(&request.url)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::UnexpectedStatus {
                status: status.as_u16(),
                url: request.url.clone(),
            });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|source| ProviderError::Deserialize {
            context: request.url.clone(),
            source,
        })
    }
}

/// Build the fetcher described by the application config: a plain
/// [`HttpFetcher`], wrapped in a [`CachingFetcher`] unless `mode` is off.
///
/// # Errors
///
/// Returns [`ProviderError::Http`] if the HTTP client cannot be built.
pub fn fetcher_from_config(
    config: &AppConfig,
    mode: FetchCacheMode,
) -> Result<Box<dyn RawFetcher>, ProviderError> {
    let http = HttpFetcher::new(config.fetch_timeout_secs, &config.fetch_user_agent)?;
    Ok(match mode {
        FetchCacheMode::Off => Box::new(http),
        mode => Box::new(CachingFetcher::new(http, config.fetch_cache_dir.clone(), mode)),
    })
}
