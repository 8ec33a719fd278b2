//! The `ingest` command: one full pipeline run from the command line.

use facmap_core::{AppConfig, FetchCacheMode};
use facmap_db::FacilityStore;
use facmap_providers::{fetcher_from_config, run_ingestion, IngestOptions};

/// Load the provider file, fetch with the requested cache mode, and replace
/// the store unless `dry_run` is set.
///
/// Returns the run report as JSON.
///
/// # Errors
///
/// Returns an error if the provider file is invalid, any provider fails, or
/// the store write fails. The store is untouched in every error case.
pub(crate) async fn run_ingest(
    config: &AppConfig,
    store: &dyn FacilityStore,
    cache: FetchCacheMode,
    dry_run: bool,
) -> anyhow::Result<serde_json::Value> {
    let providers = facmap_core::load_providers(&config.providers_path)?;
    tracing::info!(
        providers = ?providers.enabled(),
        cache = %cache,
        dry_run,
        "starting ingestion"
    );

    let fetcher = fetcher_from_config(config, cache)?;
    let report = run_ingestion(&providers, fetcher.as_ref(), store, IngestOptions { dry_run }).await?;

    if dry_run {
        tracing::info!(merged = report.merged, "dry run: store left unchanged");
    }
    Ok(serde_json::to_value(report)?)
}
