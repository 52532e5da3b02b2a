//! Run entry point shared by the HTTP trigger, the scheduler, and the CLI.
//!
//! A run is either a discovery pass (search each enabled category source and
//! create or update what comes back) or a refresh pass (re-fetch the stalest
//! products by id). Both charge the shared [`TokenBudget`] through
//! reservations and stop cleanly once it runs dry, returning whatever was
//! completed so far.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use pricecat_core::{
    AppConfig, CatalogStore, Category, CategorySource, CategorySourcesFile, Country, Product,
    StoreError,
};
use pricecat_ingest::{
    apply_item_update, generate_slug_with_full_id, new_product_from_item, price_observations,
    ApiItem, CapacityParser, IngestError, SlugInput, SnapTable,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::budget::TokenBudget;
use crate::source::{CatalogSource, CostModel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    Discovery,
    Refresh,
}

impl SyncMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SyncMode::Discovery => "discovery",
            SyncMode::Refresh => "refresh",
        }
    }

    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "discovery" => Some(SyncMode::Discovery),
            "refresh" => Some(SyncMode::Refresh),
            _ => None,
        }
    }
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to sync. `category` narrows discovery to one source and refresh to
/// one category; `limit` caps search size (discovery) or how many stale
/// products are refreshed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SyncRequest {
    pub mode: SyncMode,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl SyncRequest {
    #[must_use]
    pub fn discovery() -> Self {
        Self {
            mode: SyncMode::Discovery,
            category: None,
            limit: None,
        }
    }

    #[must_use]
    pub fn refresh() -> Self {
        Self {
            mode: SyncMode::Refresh,
            category: None,
            limit: None,
        }
    }
}

/// Result of a run, complete or partial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub success: bool,
    pub mode: SyncMode,
    /// Product writes that landed (a product refreshed in two countries
    /// counts twice).
    pub items_processed: usize,
    pub tokens_used: u64,
    /// Items dropped without error, e.g. no parsable capacity.
    pub skipped: usize,
    /// The run stopped early because the daily budget ran out.
    pub budget_exhausted: bool,
    /// Per-item and per-call failures that did not abort the run.
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The run did its work, possibly cut short by the budget.
    Completed(SyncSummary),
    /// Not a single call fit in the remaining budget; nothing was done.
    InsufficientBudget(SyncSummary),
}

impl SyncOutcome {
    #[must_use]
    pub fn summary(&self) -> &SyncSummary {
        match self {
            SyncOutcome::Completed(s) | SyncOutcome::InsufficientBudget(s) => s,
        }
    }

    #[must_use]
    pub fn into_summary(self) -> SyncSummary {
        match self {
            SyncOutcome::Completed(s) | SyncOutcome::InsufficientBudget(s) => s,
        }
    }
}

/// Failures that abort a run. Everything else is collected into
/// [`SyncSummary::errors`].
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("no countries configured for sync")]
    NoCountries,
}

/// Tuning knobs for a run, normally taken from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Markets to sync. The first is the primary market discovery searches.
    pub countries: Vec<Country>,
    pub search_limit: usize,
    pub lookup_batch_size: usize,
    pub max_categories_per_run: usize,
    /// Products synced longer ago than this are due for refresh.
    pub freshness: chrono::Duration,
    /// Pause between consecutive external calls.
    pub inter_call_delay: Duration,
    pub max_concurrent_lookups: usize,
    pub costs: CostModel,
    pub snap: SnapTable,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            countries: vec![Country::Us],
            search_limit: 50,
            lookup_batch_size: 20,
            max_categories_per_run: Category::ALL.len(),
            freshness: chrono::Duration::hours(24),
            inter_call_delay: Duration::ZERO,
            max_concurrent_lookups: 1,
            costs: CostModel::default(),
            snap: SnapTable::default(),
        }
    }
}

impl SyncSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            countries: config.countries.clone(),
            search_limit: config.search_limit as usize,
            lookup_batch_size: config.lookup_batch_size,
            max_categories_per_run: config.max_categories_per_run,
            freshness: chrono::Duration::hours(config.freshness_hours),
            inter_call_delay: Duration::from_millis(config.inter_call_delay_ms),
            max_concurrent_lookups: config.max_concurrent_lookups,
            costs: CostModel::from_app_config(config),
            snap: SnapTable::new(config.capacity_snap_points.clone()),
        }
    }
}

/// Counters accumulated while a run is in flight.
#[derive(Debug)]
pub(crate) struct RunProgress {
    mode: SyncMode,
    pub(crate) items_processed: usize,
    pub(crate) tokens_used: u64,
    pub(crate) skipped: usize,
    pub(crate) errors: Vec<String>,
    pub(crate) budget_exhausted: bool,
    /// External calls that were actually issued.
    pub(crate) calls_made: usize,
}

impl RunProgress {
    pub(crate) fn new(mode: SyncMode) -> Self {
        Self {
            mode,
            items_processed: 0,
            tokens_used: 0,
            skipped: 0,
            errors: Vec::new(),
            budget_exhausted: false,
            calls_made: 0,
        }
    }

    pub(crate) fn charge(&mut self, tokens: u64) {
        self.tokens_used = self.tokens_used.saturating_add(tokens);
    }

    pub(crate) fn finish(self) -> SyncOutcome {
        let insufficient = self.budget_exhausted && self.calls_made == 0;
        let summary = SyncSummary {
            success: !insufficient,
            mode: self.mode,
            items_processed: self.items_processed,
            tokens_used: self.tokens_used,
            skipped: self.skipped,
            budget_exhausted: self.budget_exhausted,
            errors: self.errors,
        };
        if insufficient {
            SyncOutcome::InsufficientBudget(summary)
        } else {
            SyncOutcome::Completed(summary)
        }
    }
}

pub struct SyncOrchestrator<S, C> {
    pub(crate) source: Arc<S>,
    pub(crate) store: Arc<C>,
    pub(crate) budget: Arc<TokenBudget>,
    pub(crate) categories: Arc<CategorySourcesFile>,
    pub(crate) parser: CapacityParser,
    pub(crate) settings: SyncSettings,
}

impl<S, C> SyncOrchestrator<S, C>
where
    S: CatalogSource,
    C: CatalogStore,
{
    #[must_use]
    pub fn new(
        source: Arc<S>,
        store: Arc<C>,
        budget: Arc<TokenBudget>,
        categories: Arc<CategorySourcesFile>,
        settings: SyncSettings,
    ) -> Self {
        let parser = CapacityParser::new(settings.snap.clone());
        Self {
            source,
            store,
            budget,
            categories,
            parser,
            settings,
        }
    }

    #[must_use]
    pub fn budget(&self) -> &Arc<TokenBudget> {
        &self.budget
    }

    #[must_use]
    pub fn store(&self) -> &Arc<C> {
        &self.store
    }

    /// Runs one sync pass.
    ///
    /// Budget exhaustion is not an error: a run that could not start returns
    /// [`SyncOutcome::InsufficientBudget`], one that ran out midway returns
    /// [`SyncOutcome::Completed`] with `budget_exhausted` set.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Store`] when the catalog store becomes
    /// unreachable, and [`SyncError::NoCountries`] when no market is
    /// configured.
    pub async fn run(&self, request: &SyncRequest) -> Result<SyncOutcome, SyncError> {
        if self.settings.countries.is_empty() {
            return Err(SyncError::NoCountries);
        }
        tracing::info!(
            mode = %request.mode,
            category = ?request.category,
            limit = ?request.limit,
            "sync run starting"
        );

        let outcome = match request.mode {
            SyncMode::Discovery => self.run_discovery(request).await?,
            SyncMode::Refresh => self.run_refresh(request).await?,
        };

        let summary = outcome.summary();
        tracing::info!(
            mode = %summary.mode,
            items_processed = summary.items_processed,
            tokens_used = summary.tokens_used,
            skipped = summary.skipped,
            errors = summary.errors.len(),
            budget_exhausted = summary.budget_exhausted,
            "sync run finished"
        );
        Ok(outcome)
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.budget.clock().now()
    }

    pub(crate) fn primary_country(&self) -> Country {
        self.settings.countries.first().copied().unwrap_or(Country::Us)
    }

    /// Sources a discovery run visits, in order.
    ///
    /// A named category runs even when disabled in the sources file; an
    /// unlisted one searches for its own name.
    pub(crate) fn discovery_sources(&self, category: Option<Category>) -> Vec<CategorySource> {
        match category {
            Some(category) => vec![self.categories.find(category).cloned().unwrap_or_else(|| {
                CategorySource {
                    category,
                    query: category.as_str().replace('-', " "),
                    enabled: true,
                    priority: 0,
                }
            })],
            None => self
                .categories
                .run_order()
                .into_iter()
                .take(self.settings.max_categories_per_run)
                .cloned()
                .collect(),
        }
    }

    /// Creates or updates the product behind `item` and records its price
    /// observations.
    ///
    /// `category` is required to create a product that does not exist yet;
    /// refresh passes `None` and only ever updates.
    ///
    /// # Errors
    ///
    /// Only [`StoreError::Unavailable`] propagates. Item-level problems are
    /// recorded on `progress`.
    pub(crate) async fn persist_item(
        &self,
        item: &ApiItem,
        category: Option<Category>,
        country: Country,
        now: DateTime<Utc>,
        progress: &mut RunProgress,
    ) -> Result<(), SyncError> {
        let external_id = item.id.trim();
        if external_id.is_empty() {
            progress.errors.push("item with blank id".to_owned());
            return Ok(());
        }

        if let Some(mut existing) = self.store.find_product(external_id).await? {
            let update = apply_item_update(&mut existing, item, country, &self.parser, now);
            if update.specification_changed {
                tracing::debug!(
                    external_id,
                    slug_changed = update.slug_changed,
                    "specification changed"
                );
            }
            return self
                .save(existing, update.slug_changed, item, country, now, progress)
                .await;
        }

        let Some(category) = category else {
            tracing::debug!(external_id, "lookup returned an item not in the catalog");
            progress.skipped += 1;
            return Ok(());
        };

        match new_product_from_item(item, category, country, &self.parser, now) {
            Ok((product, capacity_source)) => {
                tracing::debug!(
                    external_id,
                    slug = %product.slug,
                    ?capacity_source,
                    "new product"
                );
                self.save(product, true, item, country, now, progress).await
            }
            Err(IngestError::UnparsableCapacity { .. }) => {
                tracing::debug!(external_id, "skipping item without a parsable capacity");
                progress.skipped += 1;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(external_id, error = %e, "failed to normalize item");
                progress.errors.push(e.to_string());
                Ok(())
            }
        }
    }

    async fn save(
        &self,
        mut product: Product,
        check_slug: bool,
        item: &ApiItem,
        country: Country,
        now: DateTime<Utc>,
        progress: &mut RunProgress,
    ) -> Result<(), SyncError> {
        if check_slug {
            self.claim_unique_slug(&mut product).await?;
        }

        if !absorb_conflict(
            self.store.upsert_product(&product).await,
            &product.external_id,
            progress,
        )? {
            return Ok(());
        }

        for record in price_observations(item, country, now) {
            if !absorb_conflict(
                self.store.insert_price_record(&record).await,
                &product.external_id,
                progress,
            )? {
                break;
            }
        }

        progress.items_processed += 1;
        Ok(())
    }

    /// Falls back to the full-id slug when another product already holds
    /// this one.
    async fn claim_unique_slug(&self, product: &mut Product) -> Result<(), SyncError> {
        let Some(holder) = self.store.find_by_slug(&product.slug).await? else {
            return Ok(());
        };
        if holder.external_id == product.external_id {
            return Ok(());
        }

        let extended = generate_slug_with_full_id(&SlugInput {
            title: &product.title,
            brand: product.brand.as_deref(),
            external_id: Some(&product.external_id),
            capacity: product.capacity,
            unit: product.capacity_unit,
        });
        tracing::info!(
            external_id = %product.external_id,
            taken_by = %holder.external_id,
            slug = %product.slug,
            extended = %extended,
            "slug collision; using full external id"
        );
        product.slug = extended;
        Ok(())
    }
}

/// `Ok(true)` on success, `Ok(false)` after recording a conflict as an item
/// error, `Err` for anything fatal.
fn absorb_conflict(
    result: Result<(), StoreError>,
    external_id: &str,
    progress: &mut RunProgress,
) -> Result<bool, SyncError> {
    match result {
        Ok(()) => Ok(true),
        Err(StoreError::Conflict(reason)) => {
            tracing::warn!(external_id, reason = %reason, "catalog write conflict");
            progress.errors.push(format!("{external_id}: {reason}"));
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}
