use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use pricecat_catalog::{
    build_listings, compute_metrics, filter, localize, parse_value_list, price_trend, FilterSpec,
    Listing, LocalizedPrice, PriceTrend, ProductMetrics, SortDirection, SortKey,
};
use pricecat_core::{CatalogStore, Category, Country, Product};
use pricecat_sync::CatalogSource;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_store_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct ListingsQuery {
    pub country: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
    /// Comma-separated.
    pub condition: Option<String>,
    pub technology: Option<String>,
    pub form_factor: Option<String>,
    pub min_capacity: Option<f64>,
    pub max_capacity: Option<f64>,
    pub sort: Option<String>,
    pub direction: Option<String>,
    pub limit: Option<i64>,
}

impl ListingsQuery {
    fn filter_spec(&self) -> FilterSpec {
        FilterSpec {
            search: self.search.clone(),
            conditions: parse_value_list(self.condition.as_deref()),
            technologies: parse_value_list(self.technology.as_deref()),
            form_factors: parse_value_list(self.form_factor.as_deref()),
            min_capacity: self.min_capacity,
            max_capacity: self.max_capacity,
            sort: self.sort.as_deref().map(SortKey::from_code).unwrap_or_default(),
            direction: self
                .direction
                .as_deref()
                .map(SortDirection::from_code)
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct ListingPage {
    country: Country,
    /// Matches before `limit` was applied.
    total: usize,
    items: Vec<Listing>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ProductQuery {
    pub country: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct MarketView {
    country: Country,
    title: String,
    price: Option<LocalizedPrice>,
    metrics: Option<ProductMetrics>,
    trend: Option<PriceTrend>,
}

#[derive(Debug, Serialize)]
pub(super) struct ProductDetail {
    #[serde(flatten)]
    product: Product,
    markets: Vec<MarketView>,
}

fn parse_country(request_id: &str, raw: Option<&str>) -> Result<Option<Country>, ApiError> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|code| {
            Country::from_code(code).ok_or_else(|| {
                ApiError::new(
                    request_id,
                    "validation_error",
                    format!("unknown country: {code}"),
                )
            })
        })
        .transpose()
}

pub(super) async fn list_listings<Src, St>(
    State(state): State<AppState<Src, St>>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ListingsQuery>,
) -> Result<Json<ApiResponse<ListingPage>>, ApiError>
where
    Src: CatalogSource + 'static,
    St: CatalogStore + 'static,
{
    let country = parse_country(&req_id.0, query.country.as_deref())?.unwrap_or(Country::Us);
    let categories: Vec<Category> = match query.category.as_deref().map(str::trim) {
        Some(code) if !code.is_empty() => {
            let category = Category::from_code(code).ok_or_else(|| {
                ApiError::new(
                    req_id.0.clone(),
                    "validation_error",
                    format!("unknown category: {code}"),
                )
            })?;
            vec![category]
        }
        _ => Category::ALL.to_vec(),
    };

    let store = state.orchestrator.store();
    let mut products = Vec::new();
    for category in categories {
        let mut batch = store
            .products_by_category(category)
            .await
            .map_err(|e| map_store_error(req_id.0.clone(), &e))?;
        products.append(&mut batch);
    }

    let listings = build_listings(&products, country, &state.references);
    let mut items = filter(listings, &query.filter_spec());
    let total = items.len();
    items.truncate(normalize_limit(query.limit));

    Ok(Json(ApiResponse {
        data: ListingPage {
            country,
            total,
            items,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// `GET /api/v1/products/{slug}`: the product with one view per market it
/// has prices in, or only the requested `country`.
pub(super) async fn get_product<Src, St>(
    State(state): State<AppState<Src, St>>,
    Extension(req_id): Extension<RequestId>,
    Path(slug): Path<String>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<ApiResponse<ProductDetail>>, ApiError>
where
    Src: CatalogSource + 'static,
    St: CatalogStore + 'static,
{
    let requested = parse_country(&req_id.0, query.country.as_deref())?;
    let store = state.orchestrator.store();

    let product = store
        .find_by_slug(&slug)
        .await
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?
        .ok_or_else(|| {
            ApiError::new(
                req_id.0.clone(),
                "not_found",
                format!("product {slug} not found"),
            )
        })?;

    let countries: Vec<Country> = match requested {
        Some(country) => vec![country],
        None => product.prices.keys().copied().collect(),
    };

    let mut markets = Vec::with_capacity(countries.len());
    for country in countries {
        let localized = localize(&product, country);
        let metrics = localized
            .price
            .as_ref()
            .map(|price| compute_metrics(&product, price, &state.references));
        let trend = match localized.price.as_ref() {
            Some(price) => {
                let history = store
                    .price_history(&product.external_id, country)
                    .await
                    .map_err(|e| map_store_error(req_id.0.clone(), &e))?;
                price_trend(&history, price.price_type)
            }
            None => None,
        };
        markets.push(MarketView {
            country,
            title: localized.title,
            price: localized.price,
            metrics,
            trend,
        });
    }

    Ok(Json(ApiResponse {
        data: ProductDetail { product, markets },
        meta: ResponseMeta::new(req_id.0),
    }))
}
