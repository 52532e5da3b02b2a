//! Per-market price resolution: picks the offer a listing shows for a country.

use pricecat_core::{Country, PriceType, Product};
use rust_decimal::Decimal;
use serde::Serialize;

/// The price a market shows for a product, and which offer it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalizedPrice {
    pub amount: Decimal,
    pub currency: String,
    pub price_type: PriceType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalizedProduct {
    /// `None` when the market has no offer at all. Such products are left
    /// out of that market's listings rather than shown at zero.
    pub price: Option<LocalizedPrice>,
    pub title: String,
}

/// Resolves the price and title `product` shows in `country`.
///
/// Offers are tried in [`PriceType::PRECEDENCE`] order: the marketplace's own
/// price, then the lowest new offer, then the lowest used offer.
#[must_use]
pub fn localize(product: &Product, country: Country) -> LocalizedProduct {
    let price = product.prices_for(country).and_then(|prices| {
        PriceType::PRECEDENCE.into_iter().find_map(|price_type| {
            prices.get(price_type).map(|amount| LocalizedPrice {
                amount,
                currency: prices.currency.clone(),
                price_type,
            })
        })
    });

    LocalizedProduct {
        price,
        title: product.title_for(country).to_owned(),
    }
}
