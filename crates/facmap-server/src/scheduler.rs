//! Background job scheduler.
//!
//! When `FACMAP_INGEST_CRON` is set, the server re-runs the ingestion
//! pipeline on that schedule and drops the distinct-value cache after each
//! committed replace.

use std::sync::Arc;

use facmap_core::AppConfig;
use facmap_providers::{fetcher_from_config, run_ingestion, IngestOptions, IngestReport};
use facmap_search::FacilityService;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Builds and starts the background job scheduler with one ingestion job
/// firing on `cron`.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive for
/// the lifetime of the process. Dropping it shuts down the job.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the cron expression is invalid or the
/// scheduler cannot be started.
pub async fn build_scheduler(
    cron: &str,
    config: Arc<AppConfig>,
    service: FacilityService,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;
    register_ingest_job(&scheduler, cron, config, service).await?;
    scheduler.start().await?;
    Ok(scheduler)
}

async fn register_ingest_job(
    scheduler: &JobScheduler,
    cron: &str,
    config: Arc<AppConfig>,
    service: FacilityService,
) -> Result<(), JobSchedulerError> {
    let running = Arc::new(Mutex::new(()));

    let job = Job::new_async(cron, move |_uuid, _lock| {
        let config = Arc::clone(&config);
        let service = service.clone();
        let running = Arc::clone(&running);

        Box::pin(async move {
            let Ok(_guard) = running.try_lock() else {
                tracing::warn!("scheduler: previous ingestion still running; skipping");
                return;
            };

            tracing::info!("scheduler: starting ingestion run");
            match ingest_once(&config, &service).await {
                Ok(report) => tracing::info!(
                    merged = report.merged,
                    written = report.written,
                    generation = ?report.generation,
                    "scheduler: ingestion run complete"
                ),
                Err(e) => tracing::error!(error = %e, "scheduler: ingestion run failed"),
            }
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron, "scheduler: ingestion job registered");
    Ok(())
}

/// One full ingestion against the service's store.
async fn ingest_once(config: &AppConfig, service: &FacilityService) -> anyhow::Result<IngestReport> {
    let providers = facmap_core::load_providers(&config.providers_path)?;
    let fetcher = fetcher_from_config(config, config.fetch_cache)?;
    let report = run_ingestion(
        &providers,
        fetcher.as_ref(),
        service.store().as_ref(),
        IngestOptions::default(),
    )
    .await?;
    service.invalidate();
    Ok(report)
}
