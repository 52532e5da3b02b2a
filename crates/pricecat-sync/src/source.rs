//! The external catalog as seen by the orchestrator, plus the token cost
//! model used to size budget reservations.

use std::future::Future;

use pricecat_core::{AppConfig, Country};
use pricecat_ingest::{ApiBatch, CatalogApiClient, IngestError};

/// Search and lookup against the external catalog.
pub trait CatalogSource: Send + Sync {
    fn search(
        &self,
        query: &str,
        country: Country,
        limit: usize,
    ) -> impl Future<Output = Result<ApiBatch, IngestError>> + Send;

    fn lookup(
        &self,
        ids: &[String],
        country: Country,
    ) -> impl Future<Output = Result<ApiBatch, IngestError>> + Send;
}

impl CatalogSource for CatalogApiClient {
    async fn search(
        &self,
        query: &str,
        country: Country,
        limit: usize,
    ) -> Result<ApiBatch, IngestError> {
        CatalogApiClient::search(self, query, country, limit).await
    }

    async fn lookup(&self, ids: &[String], country: Country) -> Result<ApiBatch, IngestError> {
        CatalogApiClient::lookup(self, ids, country).await
    }
}

/// Token pricing of the external API.
///
/// Estimates are upper bounds: a search is charged as if it returned `limit`
/// items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostModel {
    pub search_cost: u64,
    pub item_cost: u64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            search_cost: 10,
            item_cost: 1,
        }
    }
}

impl CostModel {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            search_cost: config.search_token_cost,
            item_cost: config.item_token_cost,
        }
    }

    #[must_use]
    pub fn search(&self, items: usize) -> u64 {
        self.search_cost
            .saturating_add(self.item_cost.saturating_mul(u64::try_from(items).unwrap_or(u64::MAX)))
    }

    #[must_use]
    pub fn lookup(&self, ids: usize) -> u64 {
        self.item_cost.saturating_mul(u64::try_from(ids).unwrap_or(u64::MAX))
    }

    /// Billed cost of a finished call: the API's own figure when present,
    /// else the model's price for what actually came back.
    #[must_use]
    pub fn actual(reported: Option<u64>, fallback: u64) -> u64 {
        reported.unwrap_or(fallback)
    }
}
