//! In-memory [`CatalogStore`] with the same upsert, uniqueness, and
//! append-only rules as the Postgres store. Used by tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use pricecat_core::{CatalogStore, Category, Country, PriceRecord, Product, StoreError};

#[derive(Debug, Default)]
struct State {
    products: BTreeMap<String, Product>,
    history: Vec<PriceRecord>,
}

#[derive(Debug, Default)]
pub struct MemoryCatalog {
    state: RwLock<State>,
    offline: AtomicBool,
}

impl MemoryCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store, bypassing slug checks.
    #[must_use]
    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let store = Self::new();
        if let Ok(mut state) = store.state.write() {
            for product in products {
                state.products.insert(product.external_id.clone(), product);
            }
        }
        store
    }

    /// While offline every operation fails with [`StoreError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// All products ordered by `external_id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] when offline.
    pub fn all_products(&self) -> Result<Vec<Product>, StoreError> {
        Ok(self.read()?.products.values().cloned().collect())
    }

    /// Every recorded observation, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] when offline.
    pub fn price_records(&self) -> Result<Vec<PriceRecord>, StoreError> {
        Ok(self.read()?.history.clone())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.check_online()?;
        self.state
            .read()
            .map_err(|_| StoreError::Unavailable("memory catalog lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.check_online()?;
        self.state
            .write()
            .map_err(|_| StoreError::Unavailable("memory catalog lock poisoned".into()))
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("memory catalog is offline".into()))
        } else {
            Ok(())
        }
    }
}

impl CatalogStore for MemoryCatalog {
    async fn find_product(&self, external_id: &str) -> Result<Option<Product>, StoreError> {
        Ok(self.read()?.products.get(external_id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Product>, StoreError> {
        Ok(self
            .read()?
            .products
            .values()
            .find(|p| p.slug == slug)
            .cloned())
    }

    async fn upsert_product(&self, product: &Product) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if let Some(holder) = state
            .products
            .values()
            .find(|p| p.slug == product.slug && p.external_id != product.external_id)
        {
            return Err(StoreError::Conflict(format!(
                "slug '{}' already belongs to {}",
                product.slug, holder.external_id
            )));
        }
        let mut stored = product.clone();
        if let Some(existing) = state.products.get(&product.external_id) {
            stored.created_at = existing.created_at;
        }
        state.products.insert(stored.external_id.clone(), stored);
        Ok(())
    }

    async fn insert_price_record(&self, record: &PriceRecord) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if !state.products.contains_key(&record.external_id) {
            return Err(StoreError::Conflict(format!(
                "price record for unknown product {}",
                record.external_id
            )));
        }
        state.history.push(record.clone());
        Ok(())
    }

    async fn products_by_category(&self, category: Category) -> Result<Vec<Product>, StoreError> {
        Ok(self
            .read()?
            .products
            .values()
            .filter(|p| p.category == category)
            .cloned()
            .collect())
    }

    async fn stale_products(
        &self,
        synced_before: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Product>, StoreError> {
        let state = self.read()?;
        let mut stale: Vec<Product> = state
            .products
            .values()
            .filter(|p| p.last_synced_at < synced_before)
            .cloned()
            .collect();
        stale.sort_by(|a, b| {
            a.last_synced_at
                .cmp(&b.last_synced_at)
                .then_with(|| a.external_id.cmp(&b.external_id))
        });
        stale.truncate(limit);
        Ok(stale)
    }

    async fn price_history(
        &self,
        external_id: &str,
        country: Country,
    ) -> Result<Vec<PriceRecord>, StoreError> {
        let state = self.read()?;
        let mut records: Vec<PriceRecord> = state
            .history
            .iter()
            .filter(|r| r.external_id == external_id && r.country == country)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.observed_at);
        Ok(records)
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
