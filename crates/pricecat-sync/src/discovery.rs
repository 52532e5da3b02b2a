//! Discovery: one search per category source in the primary market.

use pricecat_core::CatalogStore;
use pricecat_ingest::MAX_BATCH;

use crate::orchestrator::{RunProgress, SyncError, SyncOrchestrator, SyncOutcome, SyncRequest};
use crate::source::{CatalogSource, CostModel};

impl<S, C> SyncOrchestrator<S, C>
where
    S: CatalogSource,
    C: CatalogStore,
{
    pub(crate) async fn run_discovery(
        &self,
        request: &SyncRequest,
    ) -> Result<SyncOutcome, SyncError> {
        let mut progress = RunProgress::new(request.mode);
        let sources = self.discovery_sources(request.category);
        if sources.is_empty() {
            tracing::warn!("no enabled category sources; nothing to discover");
            return Ok(progress.finish());
        }

        let country = self.primary_country();
        let limit = request
            .limit
            .unwrap_or(self.settings.search_limit)
            .clamp(1, MAX_BATCH);
        let estimate = self.settings.costs.search(limit);

        for (index, source) in sources.iter().enumerate() {
            if index > 0 && !self.settings.inter_call_delay.is_zero() {
                tokio::time::sleep(self.settings.inter_call_delay).await;
            }

            let Some(hold) = self.budget.reserve(estimate) else {
                tracing::warn!(
                    category = %source.category,
                    estimate,
                    remaining = self.budget.token_status().remaining,
                    "token budget exhausted; stopping discovery"
                );
                progress.budget_exhausted = true;
                break;
            };

            progress.calls_made += 1;
            let batch = match self.source.search(&source.query, country, limit).await {
                Ok(batch) => {
                    let actual = CostModel::actual(
                        batch.tokens_consumed,
                        self.settings.costs.search(batch.items.len()),
                    );
                    self.budget.settle(hold, actual);
                    progress.charge(actual);
                    if let Some(left) = batch.tokens_left {
                        self.budget.reconcile(left);
                    }
                    batch
                }
                Err(e) => {
                    // The API may have billed the call before failing.
                    let charged = hold.amount();
                    self.budget.settle(hold, charged);
                    progress.charge(charged);
                    tracing::warn!(
                        category = %source.category,
                        query = %source.query,
                        error = %e,
                        "category search failed"
                    );
                    progress
                        .errors
                        .push(format!("search {}: {e}", source.category));
                    continue;
                }
            };

            tracing::debug!(
                category = %source.category,
                items = batch.items.len(),
                "search returned"
            );
            let now = self.now();
            for item in &batch.items {
                self.persist_item(item, Some(source.category), country, now, &mut progress)
                    .await?;
            }
        }

        Ok(progress.finish())
    }
}
