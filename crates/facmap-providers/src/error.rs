use facmap_core::Provider;
use facmap_db::DbError;
use thiserror::Error;

/// Transport-level failures while obtaining raw provider data.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unexpected response shape from {url}: {reason}")]
    UnexpectedShape { url: String, reason: String },

    #[error("response cache {path}: {source}")]
    Cache {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failures that abort an ingestion run before the store is written.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("provider {provider} failed: {source}")]
    Provider {
        provider: Provider,
        #[source]
        source: ProviderError,
    },

    #[error("no provider is enabled")]
    NoProviders,

    #[error("store write failed: {0}")]
    Store(#[from] DbError),
}
