//! Listing assembly: localized, priced products with their metrics attached.

use pricecat_core::{CapacityUnit, Category, Country, FacetKey, PriceType, Product};
use serde::Serialize;

use crate::localize::{localize, LocalizedPrice};
use crate::metrics::{compute_metrics, ProductMetrics, ReferencePriceTable};

/// One product as a single market shows it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listing {
    pub external_id: String,
    pub slug: String,
    pub title: String,
    pub brand: Option<String>,
    pub category: Category,
    pub capacity: Option<f64>,
    pub capacity_unit: Option<CapacityUnit>,
    /// `new` or `used`; from the specification, else from the offer type.
    pub condition: String,
    pub technology: Option<String>,
    pub form_factor: Option<String>,
    pub price: LocalizedPrice,
    pub metrics: ProductMetrics,
}

impl Listing {
    #[must_use]
    pub fn from_product(
        product: &Product,
        country: Country,
        references: &ReferencePriceTable,
    ) -> Option<Self> {
        let localized = localize(product, country);
        let price = localized.price?;
        let metrics = compute_metrics(product, &price, references);

        let spec = &product.specification;
        let condition = spec.get(FacetKey::Condition).map_or_else(
            || match price.price_type {
                PriceType::Used => "used".to_owned(),
                PriceType::Marketplace | PriceType::New => "new".to_owned(),
            },
            str::to_ascii_lowercase,
        );

        Some(Self {
            external_id: product.external_id.clone(),
            slug: product.slug.clone(),
            title: localized.title,
            brand: product.brand.clone(),
            category: product.category,
            capacity: product.capacity,
            capacity_unit: product.capacity_unit,
            condition,
            technology: spec.get(FacetKey::Technology).map(str::to_owned),
            form_factor: spec.get(FacetKey::FormFactor).map(str::to_owned),
            price,
            metrics,
        })
    }
}

/// Listings for `country`, in input order. Products without any price in
/// that market are dropped.
#[must_use]
pub fn build_listings(
    products: &[Product],
    country: Country,
    references: &ReferencePriceTable,
) -> Vec<Listing> {
    products
        .iter()
        .filter_map(|p| Listing::from_product(p, country, references))
        .collect()
}
