use std::path::{Path, PathBuf};

use async_trait::async_trait;
use facmap_core::FetchCacheMode;

use super::{FetchRequest, RawFetcher};
use crate::error::ProviderError;

/// Disk cache in front of another fetcher.
///
/// Each request is stored as `<dir>/<cache_key>.json` holding the whole
/// response body, so a cached run replays exactly what the provider sent.
pub struct CachingFetcher<F> {
    inner: F,
    dir: PathBuf,
    mode: FetchCacheMode,
}

impl<F: RawFetcher> CachingFetcher<F> {
    pub fn new(inner: F, dir: impl Into<PathBuf>, mode: FetchCacheMode) -> Self {
        Self {
            inner,
            dir: dir.into(),
            mode,
        }
    }

    fn path_for(&self, request: &FetchRequest) -> PathBuf {
        self.dir.join(format!("{}.json", request.cache_key))
    }

    async fn fetch_and_store(
        &self,
        request: &FetchRequest,
        path: &Path,
    ) -> Result<serde_json::Value, ProviderError> {
        let body = self.inner.fetch(request).await?;
        write_cached(path, &body).await?;
        tracing::debug!(path = %path.display(), "stored provider response");
        Ok(body)
    }
}

fn cache_err(path: &Path) -> impl FnOnce(std::io::Error) -> ProviderError + '_ {
    move |source| ProviderError::Cache {
        path: path.display().to_string(),
        source,
    }
}

async fn read_cached(path: &Path) -> Result<serde_json::Value, ProviderError> {
    let bytes = tokio::fs::read(path).await.map_err(cache_err(path))?;
    serde_json::from_slice(&bytes).map_err(|source| ProviderError::Deserialize {
        context: path.display().to_string(),
        source,
    })
}

async fn write_cached(path: &Path, body: &serde_json::Value) -> Result<(), ProviderError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(cache_err(path))?;
    }
    let bytes = serde_json::to_vec_pretty(body).map_err(|source| ProviderError::Deserialize {
        context: path.display().to_string(),
        source,
    })?;
    tokio::fs::write(path, bytes).await.map_err(cache_err(path))
}

#[async_trait]
impl<F: RawFetcher> RawFetcher for CachingFetcher<F> {
    async fn fetch(&self, request: &FetchRequest) -> Result<serde_json::Value, ProviderError> {
        let path = self.path_for(request);
        match self.mode {
            FetchCacheMode::Off => self.inner.fetch(request).await,
            FetchCacheMode::Read => read_cached(&path).await,
            FetchCacheMode::Write => self.fetch_and_store(request, &path).await,
            FetchCacheMode::Auto => {
                if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                    tracing::debug!(path = %path.display(), "serving provider response from cache");
                    read_cached(&path).await
                } else {
                    self.fetch_and_store(request, &path).await
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::fetch::StaticFetcher;

    fn request(key: &str) -> FetchRequest {
        FetchRequest::new(format!("https://provider.test/{key}"), key)
    }

    #[tokio::test]
    async fn write_mode_persists_and_read_mode_replays() {
        let dir = tempfile::tempdir().expect("tempdir");
        let inner = StaticFetcher::new().with("multisport", json!({"ok": 1}));

        let writer = CachingFetcher::new(inner, dir.path(), FetchCacheMode::Write);
        writer.fetch(&request("multisport")).await.unwrap();
        assert!(dir.path().join("multisport.json").exists());

        let reader = CachingFetcher::new(StaticFetcher::new(), dir.path(), FetchCacheMode::Read);
        let body = reader.fetch(&request("multisport")).await.unwrap();
        assert_eq!(body, json!({"ok": 1}));
    }

    #[tokio::test]
    async fn read_mode_without_file_is_a_cache_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let reader = CachingFetcher::new(
            StaticFetcher::new().with("multisport", json!({})),
            dir.path(),
            FetchCacheMode::Read,
        );

        let err = reader.fetch(&request("multisport")).await.unwrap_err();
        assert!(matches!(err, ProviderError::Cache { .. }));
    }

    #[tokio::test]
    async fn auto_mode_only_hits_the_inner_fetcher_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let inner = StaticFetcher::new().with("medicover-card-Sport", json!({"items": []}));
        let fetcher = CachingFetcher::new(inner, dir.path().join("cache"), FetchCacheMode::Auto);

        fetcher.fetch(&request("medicover-card-Sport")).await.unwrap();
        fetcher.fetch(&request("medicover-card-Sport")).await.unwrap();

        assert_eq!(fetcher.inner.requests().len(), 1);
    }

    #[tokio::test]
    async fn inner_failure_is_not_cached() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fetcher = CachingFetcher::new(StaticFetcher::new(), dir.path(), FetchCacheMode::Write);

        assert!(fetcher.fetch(&request("multisport")).await.is_err());
        assert!(!dir.path().join("multisport.json").exists());
    }
}
