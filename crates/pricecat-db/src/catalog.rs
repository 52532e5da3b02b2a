//! Postgres-backed [`CatalogStore`]: `products` and `price_records`.
//!
//! Price maps, localized titles and specifications are stored as JSONB so a
//! product row is written in a single statement, atomic per record.

use chrono::{DateTime, Utc};
use pricecat_core::{
    CapacityUnit, CatalogStore, Category, Country, CountryPrices, PriceRecord, PriceType, Product,
    Specification, StoreError,
};
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::collections::BTreeMap;

use crate::DbError;

const PRODUCT_COLUMNS: &str = "id, external_id, title, brand, category, capacity, capacity_unit, \
     normalized_capacity, slug, prices, localized_titles, specification, \
     last_synced_at, created_at, updated_at";

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `products` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: i64,
    pub external_id: String,
    pub title: String,
    pub brand: Option<String>,
    /// Kebab-case category code, e.g. `"internal-ssd"`.
    pub category: String,
    pub capacity: Option<f64>,
    /// `"GB"` or `"TB"`.
    pub capacity_unit: Option<String>,
    pub normalized_capacity: Option<f64>,
    pub slug: String,
    /// `{"us": {"currency": "USD", "marketplace": "179.99", ...}, ...}`
    pub prices: serde_json::Value,
    pub localized_titles: serde_json::Value,
    pub specification: serde_json::Value,
    pub last_synced_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = DbError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let decode = |reason: String| DbError::Decode {
            external_id: row.external_id.clone(),
            reason,
        };

        let category = Category::from_code(&row.category)
            .ok_or_else(|| decode(format!("unknown category '{}'", row.category)))?;
        let capacity_unit = row
            .capacity_unit
            .as_deref()
            .map(|u| {
                CapacityUnit::from_code(u).ok_or_else(|| decode(format!("unknown unit '{u}'")))
            })
            .transpose()?;
        let prices: BTreeMap<Country, CountryPrices> =
            serde_json::from_value(row.prices.clone())
                .map_err(|e| decode(format!("prices: {e}")))?;
        let localized_titles: BTreeMap<Country, String> =
            serde_json::from_value(row.localized_titles.clone())
                .map_err(|e| decode(format!("localized_titles: {e}")))?;
        let specification: Specification = serde_json::from_value(row.specification.clone())
            .map_err(|e| decode(format!("specification: {e}")))?;

        Ok(Product {
            external_id: row.external_id,
            title: row.title,
            brand: row.brand,
            category,
            capacity: row.capacity,
            capacity_unit,
            normalized_capacity: row.normalized_capacity,
            slug: row.slug,
            prices,
            localized_titles,
            specification,
            last_synced_at: row.last_synced_at,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct PriceRecordRow {
    external_id: String,
    country: String,
    price: Decimal,
    currency: String,
    price_type: String,
    observed_at: DateTime<Utc>,
}

impl TryFrom<PriceRecordRow> for PriceRecord {
    type Error = DbError;

    fn try_from(row: PriceRecordRow) -> Result<Self, Self::Error> {
        let country = Country::from_code(&row.country).ok_or_else(|| DbError::Decode {
            external_id: row.external_id.clone(),
            reason: format!("unknown country '{}'", row.country),
        })?;
        let price_type = PriceType::from_code(&row.price_type).ok_or_else(|| DbError::Decode {
            external_id: row.external_id.clone(),
            reason: format!("unknown price type '{}'", row.price_type),
        })?;
        Ok(PriceRecord {
            external_id: row.external_id,
            country,
            price: row.price,
            currency: row.currency,
            price_type,
            observed_at: row.observed_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// [`CatalogStore`] over a Postgres pool.
#[derive(Debug, Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_one_where(
        &self,
        column: &'static str,
        value: &str,
    ) -> Result<Option<Product>, DbError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE {column} = $1");
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Product::try_from).transpose()
    }

    async fn upsert(&self, product: &Product) -> Result<(), DbError> {
        let encode = |reason: serde_json::Error| DbError::Decode {
            external_id: product.external_id.clone(),
            reason: reason.to_string(),
        };
        let prices = serde_json::to_value(&product.prices).map_err(encode)?;
        let localized_titles = serde_json::to_value(&product.localized_titles).map_err(encode)?;
        let specification = serde_json::to_value(&product.specification).map_err(encode)?;

        sqlx::query(
            "INSERT INTO products \
                 (external_id, title, brand, category, capacity, capacity_unit, \
                  normalized_capacity, slug, prices, localized_titles, specification, \
                  last_synced_at, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             ON CONFLICT (external_id) DO UPDATE SET \
                 title               = EXCLUDED.title, \
                 brand               = EXCLUDED.brand, \
                 category            = EXCLUDED.category, \
                 capacity            = EXCLUDED.capacity, \
                 capacity_unit       = EXCLUDED.capacity_unit, \
                 normalized_capacity = EXCLUDED.normalized_capacity, \
                 slug                = EXCLUDED.slug, \
                 prices              = EXCLUDED.prices, \
                 localized_titles    = EXCLUDED.localized_titles, \
                 specification       = EXCLUDED.specification, \
                 last_synced_at      = EXCLUDED.last_synced_at, \
                 updated_at          = NOW()",
        )
        .bind(&product.external_id)
        .bind(&product.title)
        .bind(&product.brand)
        .bind(product.category.as_str())
        .bind(product.capacity)
        .bind(product.capacity_unit.map(CapacityUnit::as_str))
        .bind(product.normalized_capacity)
        .bind(&product.slug)
        .bind(prices)
        .bind(localized_titles)
        .bind(specification)
        .bind(product.last_synced_at)
        .bind(product.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_record(&self, record: &PriceRecord) -> Result<(), DbError> {
        sqlx::query(
            "INSERT INTO price_records \
                 (external_id, country, price, currency, price_type, observed_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&record.external_id)
        .bind(record.country.code())
        .bind(record.price)
        .bind(&record.currency)
        .bind(record.price_type.as_str())
        .bind(record.observed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn by_category(&self, category: Category) -> Result<Vec<Product>, DbError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE category = $1 ORDER BY external_id"
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(category.as_str())
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Product::try_from).collect()
    }

    async fn stale(
        &self,
        synced_before: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Product>, DbError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE last_synced_at < $1 \
             ORDER BY last_synced_at, external_id \
             LIMIT $2"
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(synced_before)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Product::try_from).collect()
    }

    async fn history(
        &self,
        external_id: &str,
        country: Country,
    ) -> Result<Vec<PriceRecord>, DbError> {
        let rows = sqlx::query_as::<_, PriceRecordRow>(
            "SELECT external_id, country, price, currency, price_type, observed_at \
             FROM price_records \
             WHERE external_id = $1 AND country = $2 \
             ORDER BY observed_at, id",
        )
        .bind(external_id)
        .bind(country.code())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(PriceRecord::try_from).collect()
    }
}

impl CatalogStore for PgCatalog {
    async fn find_product(&self, external_id: &str) -> Result<Option<Product>, StoreError> {
        Ok(self.fetch_one_where("external_id", external_id).await?)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Product>, StoreError> {
        Ok(self.fetch_one_where("slug", slug).await?)
    }

    async fn upsert_product(&self, product: &Product) -> Result<(), StoreError> {
        Ok(self.upsert(product).await?)
    }

    async fn insert_price_record(&self, record: &PriceRecord) -> Result<(), StoreError> {
        Ok(self.insert_record(record).await?)
    }

    async fn products_by_category(&self, category: Category) -> Result<Vec<Product>, StoreError> {
        Ok(self.by_category(category).await?)
    }

    async fn stale_products(
        &self,
        synced_before: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Product>, StoreError> {
        Ok(self.stale(synced_before, limit).await?)
    }

    async fn price_history(
        &self,
        external_id: &str,
        country: Country,
    ) -> Result<Vec<PriceRecord>, StoreError> {
        Ok(self.history(external_id, country).await?)
    }
}
