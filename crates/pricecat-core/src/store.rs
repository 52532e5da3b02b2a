//! Storage seam between the sync pipeline and whatever persists the catalog.
//!
//! The orchestrator is the only writer. Implementations must make each
//! `upsert_product` atomic per record so concurrent readers never observe a
//! half-written product.

use std::future::Future;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::categories::Category;
use crate::products::{Country, PriceRecord, Product};

#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store cannot be reached; fatal to a sync run.
    #[error("catalog storage unavailable: {0}")]
    Unavailable(String),

    /// A write violated a uniqueness rule (e.g. slug already taken).
    #[error("catalog write conflict: {0}")]
    Conflict(String),
}

/// Catalog persistence with upsert-by-external-id semantics for products and
/// append-only inserts for price history.
pub trait CatalogStore: Send + Sync {
    /// Point lookup by source identifier.
    fn find_product(
        &self,
        external_id: &str,
    ) -> impl Future<Output = Result<Option<Product>, StoreError>> + Send;

    /// Point lookup by slug.
    fn find_by_slug(
        &self,
        slug: &str,
    ) -> impl Future<Output = Result<Option<Product>, StoreError>> + Send;

    /// Inserts or replaces the product keyed by `external_id`.
    fn upsert_product(
        &self,
        product: &Product,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Appends one observation to the price history. Never updates.
    fn insert_price_record(
        &self,
        record: &PriceRecord,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// All products in a category, ordered by `external_id`.
    fn products_by_category(
        &self,
        category: Category,
    ) -> impl Future<Output = Result<Vec<Product>, StoreError>> + Send;

    /// Products last synced strictly before `synced_before`, oldest first.
    fn stale_products(
        &self,
        synced_before: DateTime<Utc>,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Product>, StoreError>> + Send;

    /// Price history for one product and country, oldest first.
    fn price_history(
        &self,
        external_id: &str,
        country: Country,
    ) -> impl Future<Output = Result<Vec<PriceRecord>, StoreError>> + Send;
}
