//! End-to-end ingestion: fetch every enabled provider, deduplicate across
//! providers, then replace the store contents in one write.

use facmap_core::dedup::{fold_providers, PROVIDER_FOLD_ORDER};
use facmap_core::{Provider, ProvidersFile};
use facmap_db::FacilityStore;
use serde::Serialize;

use crate::adapter::{run_adapter, ProviderAdapter, ProviderReport};
use crate::error::IngestError;
use crate::fetch::RawFetcher;
use crate::medicover::MedicoverAdapter;
use crate::multisport::MultisportAdapter;

#[derive(Debug, Clone, Copy, Default)]
pub struct IngestOptions {
    /// Run every stage except the store write.
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub providers: Vec<ProviderReport>,
    /// Records left after cross-provider deduplication.
    pub merged: usize,
    pub written: usize,
    /// Store generation after the write; `None` on a dry run.
    pub generation: Option<u64>,
    pub dry_run: bool,
}

/// Adapters for every enabled provider, in fold order.
#[must_use]
pub fn build_adapters(providers: &ProvidersFile) -> Vec<Box<dyn ProviderAdapter>> {
    let enabled = providers.enabled();
    let mut adapters: Vec<Box<dyn ProviderAdapter>> = Vec::new();
    for provider in PROVIDER_FOLD_ORDER {
        if !enabled.contains(&provider) {
            continue;
        }
        match provider {
            Provider::Multisport => {
                if let Some(config) = &providers.multisport {
                    adapters.push(Box::new(MultisportAdapter::new(config.clone())));
                }
            }
            Provider::Medicover => {
                if let Some(config) = &providers.medicover {
                    adapters.push(Box::new(MedicoverAdapter::new(config.clone())));
                }
            }
        }
    }
    adapters
}

/// Run one full ingestion.
///
/// Providers run sequentially. Any provider failure aborts the run before
/// the store is touched, so a failed run never leaves a partial record set.
///
/// # Errors
///
/// Returns [`IngestError::NoProviders`] when nothing is enabled,
/// [`IngestError::Provider`] when a provider cannot be fetched, and
/// [`IngestError::Store`] when the replace fails.
pub async fn run_ingestion(
    providers: &ProvidersFile,
    fetcher: &dyn RawFetcher,
    store: &dyn FacilityStore,
    options: IngestOptions,
) -> Result<IngestReport, IngestError> {
    let adapters = build_adapters(providers);
    if adapters.is_empty() {
        return Err(IngestError::NoProviders);
    }

    let mut reports = Vec::with_capacity(adapters.len());
    let mut sets = Vec::with_capacity(adapters.len());
    for adapter in &adapters {
        let provider = adapter.provider();
        let run = run_adapter(adapter.as_ref(), fetcher)
            .await
            .map_err(|source| IngestError::Provider { provider, source })?;
        reports.push(run.report);
        sets.push((provider, run.records));
    }

    let records = fold_providers(sets);
    let merged = records.len();

    if options.dry_run {
        tracing::info!(merged, "dry run, store left unchanged");
        return Ok(IngestReport {
            providers: reports,
            merged,
            written: 0,
            generation: None,
            dry_run: true,
        });
    }

    let outcome = store.replace_all(records).await?;
    tracing::info!(
        merged,
        written = outcome.written,
        generation = outcome.generation,
        "ingestion complete"
    );

    Ok(IngestReport {
        providers: reports,
        merged,
        written: outcome.written,
        generation: Some(outcome.generation),
        dry_run: false,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use facmap_core::{MedicoverCard, MedicoverConfig, MultisportConfig};

    use super::*;

    fn multisport() -> MultisportConfig {
        MultisportConfig {
            enabled: true,
            base_url: "https://multisport.test".to_owned(),
            image_base_url: String::new(),
            cards: BTreeMap::new(),
            activities: BTreeMap::new(),
            filters: BTreeMap::new(),
        }
    }

    fn medicover() -> MedicoverConfig {
        MedicoverConfig {
            enabled: true,
            base_url: "https://medicover.test?x=1".to_owned(),
            request_delay_ms: 0,
            cards: vec![MedicoverCard {
                name: "Sport".to_owned(),
                category_vid: 1,
            }],
            filters: BTreeMap::new(),
        }
    }

    #[test]
    fn adapters_follow_fold_order_and_skip_disabled() {
        let both = ProvidersFile {
            multisport: Some(multisport()),
            medicover: Some(medicover()),
        };
        let order: Vec<Provider> = build_adapters(&both).iter().map(|a| a.provider()).collect();
        assert_eq!(order, vec![Provider::Multisport, Provider::Medicover]);

        let mut disabled = multisport();
        disabled.enabled = false;
        let only_medicover = ProvidersFile {
            multisport: Some(disabled),
            medicover: Some(medicover()),
        };
        let order: Vec<Provider> = build_adapters(&only_medicover)
            .iter()
            .map(|a| a.provider())
            .collect();
        assert_eq!(order, vec![Provider::Medicover]);
    }

    #[test]
    fn nothing_configured_builds_nothing() {
        assert!(build_adapters(&ProvidersFile::default()).is_empty());
    }
}
