//! `sync` command: one orchestrator run, tracked in `sync_runs`.

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use pricecat_core::{AppConfig, Category};
use pricecat_db::PgCatalog;
use pricecat_ingest::CatalogApiClient;
use pricecat_sync::{
    SyncMode, SyncOrchestrator, SyncOutcome, SyncRequest, SyncSettings, TokenBudget,
};

/// Runs one sync pass from the command line.
///
/// The token budget starts from what completed runs already spent today, so
/// manual runs and the server share the same daily ceiling.
///
/// # Errors
///
/// Returns an error if the category is unknown, the catalog API key is
/// missing, the run record cannot be created, or the run fails on storage.
/// A run that could not start for lack of budget is reported, not an error.
pub(crate) async fn run_sync(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    mode: SyncMode,
    category: Option<&str>,
    limit: Option<usize>,
) -> anyhow::Result<()> {
    let category = category
        .map(|code| {
            Category::from_code(code).ok_or_else(|| anyhow::anyhow!("unknown category '{code}'"))
        })
        .transpose()?;
    if limit == Some(0) {
        anyhow::bail!("--limit must be at least 1");
    }

    let api_key = config
        .catalog_api_key
        .as_deref()
        .context("PRICECAT_CATALOG_API_KEY is required for sync")?;
    let client = CatalogApiClient::new(
        api_key,
        &config.catalog_api_url,
        config.api_request_timeout_secs,
        config.api_max_retries,
        config.api_retry_backoff_base_ms,
    )
    .map_err(|e| anyhow::anyhow!("failed to build catalog API client: {e}"))?;
    let categories = pricecat_core::load_category_sources(&config.categories_path)?;

    let budget = Arc::new(TokenBudget::new(config.daily_token_budget));
    let used_today = tokens_used_today(pool).await?;
    if used_today > 0 {
        budget.record_usage(used_today);
    }

    let orchestrator = SyncOrchestrator::new(
        Arc::new(client),
        Arc::new(PgCatalog::new(pool.clone())),
        budget,
        Arc::new(categories),
        SyncSettings::from_app_config(config),
    );
    let request = SyncRequest {
        mode,
        category,
        limit,
    };

    let run = pricecat_db::create_sync_run(
        pool,
        mode.as_str(),
        "cli",
        category.map(Category::as_str),
    )
    .await?;
    if let Err(e) = pricecat_db::start_sync_run(pool, run.id).await {
        fail_run_best_effort(pool, run.id, format!("{e:#}")).await;
        return Err(e.into());
    }

    let summary = match orchestrator.run(&request).await {
        Ok(SyncOutcome::Completed(summary)) => {
            pricecat_db::complete_sync_run(
                pool,
                run.id,
                i32::try_from(summary.items_processed).unwrap_or(i32::MAX),
                i64::try_from(summary.tokens_used).unwrap_or(i64::MAX),
                i32::try_from(summary.errors.len()).unwrap_or(i32::MAX),
            )
            .await?;
            summary
        }
        Ok(SyncOutcome::InsufficientBudget(summary)) => {
            fail_run_best_effort(pool, run.id, "insufficient token budget".to_string()).await;
            println!("insufficient token budget; nothing was fetched");
            summary
        }
        Err(e) => {
            fail_run_best_effort(pool, run.id, format!("{e:#}")).await;
            return Err(e.into());
        }
    };

    for error in &summary.errors {
        tracing::warn!(run_id = run.id, "{error}");
    }
    println!(
        "{} run {}: {} items, {} skipped, {} tokens, {} errors{}",
        summary.mode,
        run.public_id,
        summary.items_processed,
        summary.skipped,
        summary.tokens_used,
        summary.errors.len(),
        if summary.budget_exhausted {
            " (stopped: budget exhausted)"
        } else {
            ""
        }
    );
    Ok(())
}

pub(crate) async fn tokens_used_today(pool: &sqlx::PgPool) -> anyhow::Result<u64> {
    let midnight = Utc::now()
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .context("invalid UTC midnight")?
        .and_utc();
    let used = pricecat_db::tokens_used_since(pool, midnight).await?;
    Ok(u64::try_from(used).unwrap_or(0))
}

async fn fail_run_best_effort(pool: &sqlx::PgPool, run_id: i64, message: String) {
    if let Err(mark_err) = pricecat_db::fail_sync_run(pool, run_id, &message).await {
        tracing::error!(
            run_id,
            error = %mark_err,
            "failed to mark sync run as failed"
        );
    }
}
