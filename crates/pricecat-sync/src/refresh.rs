//! Refresh: re-fetch the stalest products by id, in every configured market.
//!
//! Lookups run with bounded concurrency; their results are applied to the
//! store one at a time, in job order.

use std::sync::atomic::{AtomicBool, Ordering};

use futures::stream::{self, StreamExt};
use pricecat_core::{CatalogStore, Country, Product};
use pricecat_ingest::{ApiBatch, IngestError};

use crate::orchestrator::{RunProgress, SyncError, SyncOrchestrator, SyncOutcome, SyncRequest};
use crate::source::{CatalogSource, CostModel};

/// Stale products refreshed per run when the request sets no limit.
const DEFAULT_REFRESH_LIMIT: usize = 100;

struct LookupJob {
    index: usize,
    country: Country,
    ids: Vec<String>,
}

enum LookupResult {
    Fetched { batch: ApiBatch, tokens: u64 },
    Failed { error: IngestError, tokens: u64 },
    /// The reservation for this job was refused.
    NoBudget,
    /// An earlier job exhausted the budget; this one never ran.
    Cancelled,
}

impl<S, C> SyncOrchestrator<S, C>
where
    S: CatalogSource,
    C: CatalogStore,
{
    pub(crate) async fn run_refresh(
        &self,
        request: &SyncRequest,
    ) -> Result<SyncOutcome, SyncError> {
        let mut progress = RunProgress::new(request.mode);
        let limit = request.limit.unwrap_or(DEFAULT_REFRESH_LIMIT);
        let stale = self.stale_products(request, limit).await?;
        if stale.is_empty() {
            tracing::info!("no stale products; nothing to refresh");
            return Ok(progress.finish());
        }
        tracing::info!(products = stale.len(), "refreshing stale products");

        let ids: Vec<String> = stale.into_iter().map(|p| p.external_id).collect();
        let jobs = self.lookup_jobs(&ids);
        let exhausted = AtomicBool::new(false);

        let mut results = stream::iter(jobs)
            .map(|job| {
                let exhausted = &exhausted;
                async move {
                    let result = self.execute_lookup(&job, exhausted).await;
                    (job, result)
                }
            })
            .buffered(self.settings.max_concurrent_lookups.max(1));

        while let Some((job, result)) = results.next().await {
            match result {
                LookupResult::Fetched { batch, tokens } => {
                    progress.calls_made += 1;
                    progress.charge(tokens);
                    let now = self.now();
                    for item in &batch.items {
                        self.persist_item(item, None, job.country, now, &mut progress)
                            .await?;
                    }
                    let missing = job.ids.len().saturating_sub(batch.items.len());
                    if missing > 0 {
                        tracing::debug!(
                            country = %job.country,
                            missing,
                            "lookup did not return every requested id"
                        );
                        progress.skipped += missing;
                    }
                }
                LookupResult::Failed { error, tokens } => {
                    progress.calls_made += 1;
                    progress.charge(tokens);
                    tracing::warn!(
                        country = %job.country,
                        batch = job.index,
                        error = %error,
                        "lookup failed"
                    );
                    progress
                        .errors
                        .push(format!("lookup {} batch {}: {error}", job.country, job.index));
                }
                LookupResult::NoBudget => progress.budget_exhausted = true,
                LookupResult::Cancelled => {}
            }
        }

        Ok(progress.finish())
    }

    async fn stale_products(
        &self,
        request: &SyncRequest,
        limit: usize,
    ) -> Result<Vec<Product>, SyncError> {
        let cutoff = self.now() - self.settings.freshness;
        let Some(category) = request.category else {
            return Ok(self.store.stale_products(cutoff, limit).await?);
        };

        let mut stale: Vec<Product> = self
            .store
            .products_by_category(category)
            .await?
            .into_iter()
            .filter(|p| p.last_synced_at < cutoff)
            .collect();
        stale.sort_by(|a, b| {
            a.last_synced_at
                .cmp(&b.last_synced_at)
                .then_with(|| a.external_id.cmp(&b.external_id))
        });
        stale.truncate(limit);
        Ok(stale)
    }

    /// One job per (country, id chunk), countries in configured order.
    fn lookup_jobs(&self, ids: &[String]) -> Vec<LookupJob> {
        let chunk = self.settings.lookup_batch_size.max(1);
        self.settings
            .countries
            .iter()
            .flat_map(|&country| ids.chunks(chunk).map(move |c| (country, c.to_vec())))
            .enumerate()
            .map(|(index, (country, ids))| LookupJob {
                index,
                country,
                ids,
            })
            .collect()
    }

    async fn execute_lookup(&self, job: &LookupJob, exhausted: &AtomicBool) -> LookupResult {
        if job.index > 0 && !self.settings.inter_call_delay.is_zero() {
            tokio::time::sleep(self.settings.inter_call_delay).await;
        }
        if exhausted.load(Ordering::SeqCst) {
            return LookupResult::Cancelled;
        }

        let estimate = self.settings.costs.lookup(job.ids.len());
        let Some(hold) = self.budget.reserve(estimate) else {
            if !exhausted.swap(true, Ordering::SeqCst) {
                tracing::warn!(
                    country = %job.country,
                    batch = job.index,
                    estimate,
                    "token budget exhausted; stopping refresh"
                );
            }
            return LookupResult::NoBudget;
        };

        match self.source.lookup(&job.ids, job.country).await {
            Ok(batch) => {
                let tokens = CostModel::actual(
                    batch.tokens_consumed,
                    self.settings.costs.lookup(job.ids.len()),
                );
                self.budget.settle(hold, tokens);
                if let Some(left) = batch.tokens_left {
                    self.budget.reconcile(left);
                }
                LookupResult::Fetched { batch, tokens }
            }
            Err(error) => {
                let tokens = hold.amount();
                self.budget.settle(hold, tokens);
                LookupResult::Failed { error, tokens }
            }
        }
    }
}

