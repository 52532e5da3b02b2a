//! Derived price signals. Nothing here is stored; every value is computed
//! on read from the product, its resolved price, and (for trends) its price
//! history.

use std::collections::HashMap;

use pricecat_core::{Category, FacetKey, PriceRecord, PriceType, Product};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::localize::LocalizedPrice;

/// Relative move between the two latest observations that counts as a
/// trend, in percent.
const TREND_THRESHOLD_PERCENT: Decimal = Decimal::TWO;

const MAX_DISCOUNT_PERCENT: u8 = 99;

/// Storage technology groups that share a reference price level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TechnologyFamily {
    Nvme,
    SataSsd,
    Hdd,
    Flash,
}

impl TechnologyFamily {
    pub const ALL: [TechnologyFamily; 4] = [
        TechnologyFamily::Nvme,
        TechnologyFamily::SataSsd,
        TechnologyFamily::Hdd,
        TechnologyFamily::Flash,
    ];

    /// Family from the category, refined by the `technology` facet for SSDs.
    #[must_use]
    pub fn of(product: &Product) -> Self {
        match product.category {
            Category::InternalHdd | Category::ExternalHdd => TechnologyFamily::Hdd,
            Category::MicroSd | Category::UsbFlash => TechnologyFamily::Flash,
            Category::InternalSsd | Category::ExternalSsd => {
                let nvme = product
                    .specification
                    .get(FacetKey::Technology)
                    .is_some_and(|t| t.to_ascii_lowercase().contains("nvme"))
                    || product.title.to_ascii_lowercase().contains("nvme");
                if nvme {
                    TechnologyFamily::Nvme
                } else {
                    TechnologyFamily::SataSsd
                }
            }
        }
    }
}

/// Typical market price per gigabyte, per technology family and currency.
/// Discounts are measured against it.
#[derive(Debug, Clone)]
pub struct ReferencePriceTable {
    per_gb: HashMap<(TechnologyFamily, String), Decimal>,
}

impl Default for ReferencePriceTable {
    fn default() -> Self {
        // (family, USD, GBP, EUR, CAD) in ten-thousandths per GB.
        const LEVELS: [(TechnologyFamily, [i64; 4]); 4] = [
            (TechnologyFamily::Nvme, [800, 650, 750, 1_100]),
            (TechnologyFamily::SataSsd, [700, 580, 650, 950]),
            (TechnologyFamily::Hdd, [200, 170, 190, 280]),
            (TechnologyFamily::Flash, [1_000, 850, 950, 1_400]),
        ];
        let mut table = Self::empty();
        for (family, levels) in LEVELS {
            for (currency, level) in ["USD", "GBP", "EUR", "CAD"].into_iter().zip(levels) {
                table.set(family, currency, Decimal::new(level, 4));
            }
        }
        table
    }
}

impl ReferencePriceTable {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            per_gb: HashMap::new(),
        }
    }

    pub fn set(&mut self, family: TechnologyFamily, currency: &str, per_gb: Decimal) {
        self.per_gb
            .insert((family, currency.to_ascii_uppercase()), per_gb);
    }

    #[must_use]
    pub fn get(&self, family: TechnologyFamily, currency: &str) -> Option<Decimal> {
        self.per_gb
            .get(&(family, currency.to_ascii_uppercase()))
            .copied()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductMetrics {
    /// Price per gigabyte. `None` when capacity is missing or zero.
    pub price_per_unit: Option<Decimal>,
    /// Price per display unit of the category (per TB for hard drives).
    pub price_per_display_unit: Option<Decimal>,
    pub normalized_capacity: Option<f64>,
    /// Capacity in the category's display unit.
    pub display_capacity: Option<f64>,
    pub technology_family: TechnologyFamily,
    /// Percent below the family's reference price per GB, 0 to 99.
    pub discount_percent: Option<u8>,
}

/// Computes the derived metrics for `product` at `price`.
#[must_use]
pub fn compute_metrics(
    product: &Product,
    price: &LocalizedPrice,
    references: &ReferencePriceTable,
) -> ProductMetrics {
    let capacity = product
        .normalized_capacity
        .filter(|c| c.is_finite() && *c > 0.0);
    let price_per_unit = capacity
        .and_then(|c| Decimal::try_from(c).ok())
        .and_then(|c| price.amount.checked_div(c))
        .map(|ppu| ppu.round_dp(6));

    let display_unit = product.category.display_unit();
    let per_display = Decimal::try_from(display_unit.gigabytes_per_unit()).ok();
    let price_per_display_unit = price_per_unit
        .zip(per_display)
        .and_then(|(ppu, factor)| ppu.checked_mul(factor))
        .map(|p| p.round_dp(4));

    let family = TechnologyFamily::of(product);
    let discount_percent = price_per_unit.and_then(|ppu| {
        references
            .get(family, &price.currency)
            .and_then(|reference| discount(ppu, reference))
    });

    ProductMetrics {
        price_per_unit,
        price_per_display_unit,
        normalized_capacity: capacity,
        display_capacity: capacity.map(|c| c / display_unit.gigabytes_per_unit()),
        technology_family: family,
        discount_percent,
    }
}

fn discount(price_per_unit: Decimal, reference: Decimal) -> Option<u8> {
    if reference <= Decimal::ZERO {
        return None;
    }
    if price_per_unit >= reference {
        return Some(0);
    }
    let percent = ((reference - price_per_unit) / reference * Decimal::ONE_HUNDRED).round();
    percent
        .to_u8()
        .map(|p| p.min(MAX_DISCOUNT_PERCENT))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceTrend {
    Rising,
    Falling,
    Stable,
}

/// Direction of the latest move in `history` for `price_type`.
///
/// Compares the newest observation with the one before it; moves within
/// 2% either way are stable. `None` with fewer than two observations.
/// `history` must be oldest first, as the store returns it.
#[must_use]
pub fn price_trend(history: &[PriceRecord], price_type: PriceType) -> Option<PriceTrend> {
    let mut observed = history
        .iter()
        .rev()
        .filter(|r| r.price_type == price_type)
        .map(|r| r.price);
    let latest = observed.next()?;
    let previous = observed.next()?;
    if previous <= Decimal::ZERO {
        return None;
    }

    let change = (latest - previous) / previous * Decimal::ONE_HUNDRED;
    Some(if change > TREND_THRESHOLD_PERCENT {
        PriceTrend::Rising
    } else if change < -TREND_THRESHOLD_PERCENT {
        PriceTrend::Falling
    } else {
        PriceTrend::Stable
    })
}

#[cfg(test)]
#[path = "metrics_test.rs"]
mod tests;
