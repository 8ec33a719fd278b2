use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use super::{FetchRequest, RawFetcher};
use crate::error::ProviderError;

/// Serves canned bodies keyed by `cache_key`.
///
/// Unknown keys answer `404`; keys registered with
/// [`failing`](StaticFetcher::failing) answer `503`. Every request is
/// recorded so callers can assert on order.
#[derive(Debug, Default)]
pub struct StaticFetcher {
    bodies: HashMap<String, serde_json::Value>,
    failing: HashSet<String>,
    seen: Mutex<Vec<FetchRequest>>,
}

impl StaticFetcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, cache_key: impl Into<String>, body: serde_json::Value) -> Self {
        self.bodies.insert(cache_key.into(), body);
        self
    }

    #[must_use]
    pub fn failing(mut self, cache_key: impl Into<String>) -> Self {
        self.failing.insert(cache_key.into());
        self
    }

    /// Requests received so far, in arrival order.
    pub fn requests(&self) -> Vec<FetchRequest> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl RawFetcher for StaticFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<serde_json::Value, ProviderError> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        if self.failing.contains(&request.cache_key) {
            return Err(ProviderError::UnexpectedStatus {
                status: 503,
                url: request.url.clone(),
            });
        }
        self.bodies
            .get(&request.cache_key)
            .cloned()
            .ok_or_else(|| ProviderError::UnexpectedStatus {
                status: 404,
                url: request.url.clone(),
            })
    }
}
