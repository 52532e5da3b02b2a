//! Sync-run bookkeeping around orchestrator runs.
//!
//! Every trigger (HTTP or scheduler) goes through [`run_recorded`]. When a
//! database pool is attached the run is tracked in `sync_runs`; bookkeeping
//! failures are logged and never change the run's outcome.

use chrono::Utc;
use pricecat_core::CatalogStore;
use pricecat_db::SyncRunRow;
use pricecat_sync::{
    CatalogSource, SyncError, SyncOrchestrator, SyncOutcome, SyncRequest, TokenBudget,
};
use sqlx::PgPool;
use uuid::Uuid;

pub struct RecordedRun {
    /// Public id of the `sync_runs` row, when one was written.
    pub run_id: Option<Uuid>,
    pub outcome: Result<SyncOutcome, SyncError>,
}

pub async fn run_recorded<Src, St>(
    orchestrator: &SyncOrchestrator<Src, St>,
    pool: Option<&PgPool>,
    request: &SyncRequest,
    trigger_source: &str,
) -> RecordedRun
where
    Src: CatalogSource,
    St: CatalogStore,
{
    let run = match pool {
        Some(pool) => open_run(pool, request, trigger_source).await,
        None => None,
    };

    let outcome = orchestrator.run(request).await;

    if let (Some(pool), Some(run)) = (pool, run.as_ref()) {
        close_run(pool, run.id, &outcome).await;
    }

    RecordedRun {
        run_id: run.map(|r| r.public_id),
        outcome,
    }
}

async fn open_run(
    pool: &PgPool,
    request: &SyncRequest,
    trigger_source: &str,
) -> Option<SyncRunRow> {
    let category = request.category.map(|c| c.as_str());
    let run = match pricecat_db::create_sync_run(
        pool,
        request.mode.as_str(),
        trigger_source,
        category,
    )
    .await
    {
        Ok(run) => run,
        Err(e) => {
            tracing::warn!(error = %e, "failed to create sync run record");
            return None;
        }
    };

    if let Err(e) = pricecat_db::start_sync_run(pool, run.id).await {
        tracing::warn!(run_id = run.id, error = %e, "failed to mark sync run as running");
        fail_run_best_effort(pool, run.id, "could not start run record").await;
        return None;
    }
    Some(run)
}

async fn close_run(pool: &PgPool, run_id: i64, outcome: &Result<SyncOutcome, SyncError>) {
    match outcome {
        Ok(SyncOutcome::Completed(summary)) => {
            let items = i32::try_from(summary.items_processed).unwrap_or(i32::MAX);
            let tokens = i64::try_from(summary.tokens_used).unwrap_or(i64::MAX);
            let errors = i32::try_from(summary.errors.len()).unwrap_or(i32::MAX);
            if let Err(e) =
                pricecat_db::complete_sync_run(pool, run_id, items, tokens, errors).await
            {
                tracing::warn!(run_id, error = %e, "failed to mark sync run as completed");
                fail_run_best_effort(pool, run_id, "could not record completion").await;
            }
        }
        Ok(SyncOutcome::InsufficientBudget(_)) => {
            fail_run_best_effort(pool, run_id, "insufficient token budget").await;
        }
        Err(e) => fail_run_best_effort(pool, run_id, &e.to_string()).await,
    }
}

async fn fail_run_best_effort(pool: &PgPool, run_id: i64, message: &str) {
    if let Err(e) = pricecat_db::fail_sync_run(pool, run_id, message).await {
        tracing::error!(run_id, error = %e, "failed to mark sync run as failed");
    }
}

/// Folds tokens already spent today (per `sync_runs`) into `budget`, so a
/// restarted process does not hand out the full ceiling again.
pub async fn seed_budget_from_history(pool: &PgPool, budget: &TokenBudget) {
    let Some(midnight) = Utc::now().date_naive().and_hms_opt(0, 0, 0) else {
        return;
    };
    match pricecat_db::tokens_used_since(pool, midnight.and_utc()).await {
        Ok(used) => {
            let used = u64::try_from(used).unwrap_or(0);
            if used > 0 {
                budget.record_usage(used);
            }
            tracing::info!(used_today = used, "seeded token budget from sync history");
        }
        Err(e) => tracing::warn!(error = %e, "could not read today's token usage"),
    }
}
