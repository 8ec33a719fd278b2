//! The per-provider capability set and the generic driver that runs it.

use std::collections::BTreeMap;

use async_trait::async_trait;
use facmap_core::{CanonicalFacility, Provider};
use serde::Serialize;
use thiserror::Error;

use crate::error::ProviderError;
use crate::fetch::RawFetcher;

/// One untyped item from a provider response.
#[derive(Debug, Clone, PartialEq)]
pub struct RawItem {
    pub value: serde_json::Value,
    /// Card whose sub-fetch produced the item, for tag-scoped providers.
    pub tag: Option<String>,
}

impl RawItem {
    #[must_use]
    pub fn new(value: serde_json::Value) -> Self {
        Self { value, tag: None }
    }

    #[must_use]
    pub fn tagged(value: serde_json::Value, tag: impl Into<String>) -> Self {
        Self {
            value,
            tag: Some(tag.into()),
        }
    }
}

/// Why a raw item was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// An external facility source.
///
/// `validate` and `transform` are pure. `transform` is only called on items
/// that passed `validate` and never fails; fields the provider cannot
/// supply are left at their zero value.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn provider(&self) -> Provider;

    /// Retrieve every raw item.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] when the provider cannot be read at all.
    async fn fetch(&self, fetcher: &dyn RawFetcher) -> Result<Vec<RawItem>, ProviderError>;

    /// # Errors
    ///
    /// Returns [`ValidationError`] naming the first failed check.
    fn validate(&self, item: &RawItem) -> Result<(), ValidationError>;

    fn transform(&self, item: &RawItem) -> CanonicalFacility;

    /// Collapse records the provider itself reports more than once.
    fn aggregate(&self, records: Vec<CanonicalFacility>) -> Vec<CanonicalFacility> {
        records
    }
}

/// Per-provider counters of one ingestion run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderReport {
    pub provider: Provider,
    pub fetched: usize,
    pub valid: usize,
    pub invalid: usize,
    /// Invalid items per tag, for tag-scoped providers.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub invalid_by_tag: BTreeMap<String, usize>,
    /// Records after provider-local aggregation.
    pub emitted: usize,
}

#[derive(Debug)]
pub struct AdapterRun {
    pub report: ProviderReport,
    pub records: Vec<CanonicalFacility>,
}

/// Fetch, validate, transform and aggregate one provider.
///
/// Invalid items are logged and skipped.
///
/// # Errors
///
/// Propagates the adapter's fetch failure.
pub async fn run_adapter(
    adapter: &dyn ProviderAdapter,
    fetcher: &dyn RawFetcher,
) -> Result<AdapterRun, ProviderError> {
    let provider = adapter.provider();
    let items = adapter.fetch(fetcher).await?;
    let fetched = items.len();

    let mut invalid = 0;
    let mut invalid_by_tag: BTreeMap<String, usize> = BTreeMap::new();
    let mut records = Vec::with_capacity(fetched);
    for item in &items {
        match adapter.validate(item) {
            Ok(()) => records.push(adapter.transform(item)),
            Err(reason) => {
                invalid += 1;
                if let Some(tag) = &item.tag {
                    *invalid_by_tag.entry(tag.clone()).or_default() += 1;
                }
                tracing::warn!(
                    %provider,
                    tag = item.tag.as_deref().unwrap_or_default(),
                    %reason,
                    "skipping invalid item"
                );
            }
        }
    }
    let valid = records.len();
    let records = adapter.aggregate(records);

    for (tag, count) in &invalid_by_tag {
        tracing::info!(%provider, tag = %tag, invalid = count, "invalid items for tag");
    }

    let report = ProviderReport {
        provider,
        fetched,
        valid,
        invalid,
        invalid_by_tag,
        emitted: records.len(),
    };
    tracing::info!(
        %provider,
        fetched,
        valid,
        invalid,
        emitted = report.emitted,
        "provider adapter finished"
    );
    Ok(AdapterRun { report, records })
}
