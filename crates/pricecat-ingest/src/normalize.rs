//! Conversion from raw [`ApiItem`]s into catalog [`Product`]s and
//! [`PriceRecord`] observations.
//!
//! Capacity parsing is delegated to [`crate::capacity`] and slugging to
//! [`crate::slug`]; this module only handles structural mapping.

use chrono::{DateTime, Utc};
use pricecat_core::{Category, Country, FacetKey, PriceRecord, PriceType, Product, Specification};
use rust_decimal::Decimal;

use crate::capacity::{CapacityParser, CapacitySource};
use crate::error::IngestError;
use crate::slug::{generate_slug, SlugInput};
use crate::types::ApiItem;

/// What [`apply_item_update`] changed on an existing product.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItemUpdate {
    pub specification_changed: bool,
    pub slug_changed: bool,
}

/// Builds a brand-new [`Product`] from a discovered item.
///
/// # Errors
///
/// - [`IngestError::Normalization`] if the item has a blank id or title.
/// - [`IngestError::UnparsableCapacity`] if neither the structured capacity
///   field nor the title yields a capacity. Callers count this as a skip.
pub fn new_product_from_item(
    item: &ApiItem,
    category: Category,
    country: Country,
    parser: &CapacityParser,
    now: DateTime<Utc>,
) -> Result<(Product, CapacitySource), IngestError> {
    let external_id = item.id.trim();
    if external_id.is_empty() {
        return Err(IngestError::Normalization {
            external_id: item.id.clone(),
            reason: "blank external id".into(),
        });
    }
    let title = item.title.trim();
    if title.is_empty() {
        return Err(IngestError::Normalization {
            external_id: external_id.to_owned(),
            reason: "blank title".into(),
        });
    }

    let specification = specification_from_item(item);
    let (capacity, source) = parser
        .extract(specification.get(FacetKey::Capacity), title)
        .ok_or_else(|| IngestError::UnparsableCapacity {
            external_id: external_id.to_owned(),
        })?;

    let brand = item
        .brand
        .as_deref()
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .map(str::to_owned);

    let slug = generate_slug(&SlugInput {
        title,
        brand: brand.as_deref(),
        external_id: Some(external_id),
        capacity: Some(capacity.value),
        unit: Some(capacity.unit),
    });

    let mut product = Product {
        external_id: external_id.to_owned(),
        title: title.to_owned(),
        brand,
        category,
        capacity: Some(capacity.value),
        capacity_unit: Some(capacity.unit),
        normalized_capacity: Some(capacity.normalized_gb),
        slug,
        prices: std::collections::BTreeMap::new(),
        localized_titles: std::collections::BTreeMap::new(),
        specification,
        last_synced_at: now,
        created_at: now,
    };
    apply_prices(&mut product, item, country);
    apply_localized_title(&mut product, item, country);

    Ok((product, source))
}

/// Refreshes an existing product in place from a re-fetched item.
///
/// Prices for `country` are replaced wholesale (a missing offer clears the
/// slot). Title and specification are refreshed. Capacity and slug are only
/// recomputed when the specification actually changed; if the new
/// specification no longer yields a capacity the previous values stand.
pub fn apply_item_update(
    product: &mut Product,
    item: &ApiItem,
    country: Country,
    parser: &CapacityParser,
    now: DateTime<Utc>,
) -> ItemUpdate {
    let mut update = ItemUpdate::default();

    let title = item.title.trim();
    if !title.is_empty() {
        title.clone_into(&mut product.title);
    }

    let specification = specification_from_item(item);
    if specification != product.specification {
        update.specification_changed = true;
        product.specification = specification;

        if let Some((capacity, _)) =
            parser.extract(product.specification.get(FacetKey::Capacity), &product.title)
        {
            product.capacity = Some(capacity.value);
            product.capacity_unit = Some(capacity.unit);
            product.normalized_capacity = Some(capacity.normalized_gb);
        }

        let slug = generate_slug(&SlugInput {
            title: &product.title,
            brand: product.brand.as_deref(),
            external_id: Some(&product.external_id),
            capacity: product.capacity,
            unit: product.capacity_unit,
        });
        if slug != product.slug {
            update.slug_changed = true;
            product.slug = slug;
        }
    }

    apply_prices(product, item, country);
    apply_localized_title(product, item, country);
    product.last_synced_at = now;

    update
}

/// One [`PriceRecord`] per offer type the item carries a price for.
#[must_use]
pub fn price_observations(item: &ApiItem, country: Country, now: DateTime<Utc>) -> Vec<PriceRecord> {
    PriceType::PRECEDENCE
        .into_iter()
        .filter_map(|price_type| {
            offer_price(item, price_type).map(|price| PriceRecord {
                external_id: item.id.trim().to_owned(),
                country,
                price,
                currency: country.currency().to_owned(),
                price_type,
                observed_at: now,
            })
        })
        .collect()
}

fn offer_price(item: &ApiItem, price_type: PriceType) -> Option<Decimal> {
    match price_type {
        PriceType::Marketplace => item.prices.marketplace(),
        PriceType::New => item.prices.new_price(),
        PriceType::Used => item.prices.used(),
    }
}

fn apply_prices(product: &mut Product, item: &ApiItem, country: Country) {
    for price_type in PriceType::PRECEDENCE {
        product.set_price(country, price_type, offer_price(item, price_type));
    }
}

fn apply_localized_title(product: &mut Product, item: &ApiItem, country: Country) {
    match item
        .localized_title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty() && *t != product.title)
    {
        Some(localized) => {
            product
                .localized_titles
                .insert(country, localized.to_owned());
        }
        None => {
            product.localized_titles.remove(&country);
        }
    }
}

fn specification_from_item(item: &ApiItem) -> Specification {
    let mut spec = Specification::new();
    for (key, value) in &item.attributes {
        spec.insert(key, value.as_str());
    }
    if let Some(capacity) = item.capacity.as_deref() {
        spec.insert(FacetKey::Capacity.as_str(), capacity);
    }
    spec
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
