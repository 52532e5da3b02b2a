//! Background job scheduler.
//!
//! Registers the recurring discovery and refresh runs. Both share the
//! orchestrator, and with it the process-wide token budget that manual
//! triggers draw from.

use std::sync::Arc;

use pricecat_core::{AppConfig, CatalogStore};
use pricecat_sync::{CatalogSource, SyncOrchestrator, SyncOutcome, SyncRequest};
use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::runs::run_recorded;

/// Builds and starts the background job scheduler.
///
/// The returned [`JobScheduler`] must be kept alive for the lifetime of the
/// process; dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// a cron expression is invalid, or the scheduler fails to start.
pub async fn build_scheduler<Src, St>(
    orchestrator: Arc<SyncOrchestrator<Src, St>>,
    pool: Option<PgPool>,
    config: &AppConfig,
) -> Result<JobScheduler, JobSchedulerError>
where
    Src: CatalogSource + 'static,
    St: CatalogStore + 'static,
{
    let scheduler = JobScheduler::new().await?;

    register_sync_job(
        &scheduler,
        &config.discovery_cron,
        SyncRequest::discovery(),
        Arc::clone(&orchestrator),
        pool.clone(),
    )
    .await?;
    register_sync_job(
        &scheduler,
        &config.refresh_cron,
        SyncRequest::refresh(),
        orchestrator,
        pool,
    )
    .await?;

    scheduler.start().await?;
    Ok(scheduler)
}

async fn register_sync_job<Src, St>(
    scheduler: &JobScheduler,
    cron: &str,
    request: SyncRequest,
    orchestrator: Arc<SyncOrchestrator<Src, St>>,
    pool: Option<PgPool>,
) -> Result<(), JobSchedulerError>
where
    Src: CatalogSource + 'static,
    St: CatalogStore + 'static,
{
    let job = Job::new_async(cron, move |_uuid, _lock| {
        let orchestrator = Arc::clone(&orchestrator);
        let pool = pool.clone();

        Box::pin(async move {
            tracing::info!(mode = %request.mode, "scheduler: starting sync run");
            let recorded =
                run_recorded(&orchestrator, pool.as_ref(), &request, "scheduler").await;
            match recorded.outcome {
                Ok(SyncOutcome::Completed(summary)) => tracing::info!(
                    mode = %summary.mode,
                    items = summary.items_processed,
                    tokens = summary.tokens_used,
                    errors = summary.errors.len(),
                    budget_exhausted = summary.budget_exhausted,
                    "scheduler: sync run complete"
                ),
                Ok(SyncOutcome::InsufficientBudget(_)) => tracing::warn!(
                    mode = %request.mode,
                    "scheduler: skipped sync run, daily token budget exhausted"
                ),
                Err(e) => tracing::error!(
                    mode = %request.mode,
                    error = %e,
                    "scheduler: sync run failed"
                ),
            }
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron, mode = %request.mode, "scheduler: registered sync job");
    Ok(())
}
