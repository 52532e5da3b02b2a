//! Facet, range, and search filtering plus stable sorting over listings.
//!
//! [`filter`] is pure and total: the same listings and filter always produce
//! the same ordered output, and no input makes it fail.

use std::cmp::Ordering;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::listing::Listing;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    Price,
    #[default]
    PricePerUnit,
    Capacity,
    Title,
    Brand,
}

impl SortKey {
    /// Unknown keys and `popular` fall back to price per unit.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "price" => SortKey::Price,
            "capacity" => SortKey::Capacity,
            "title" | "name" => SortKey::Title,
            "brand" => SortKey::Brand,
            _ => SortKey::PricePerUnit,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        if code.trim().eq_ignore_ascii_case("desc") {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }
}

/// Request-scoped listing query. An empty facet set means "no constraint".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    pub search: Option<String>,
    pub conditions: Vec<String>,
    pub technologies: Vec<String>,
    pub form_factors: Vec<String>,
    /// Inclusive bounds in each listing's category display unit.
    pub min_capacity: Option<f64>,
    pub max_capacity: Option<f64>,
    pub sort: SortKey,
    pub direction: SortDirection,
}

/// Splits a comma-separated query value into trimmed, non-empty entries.
#[must_use]
pub fn parse_value_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|r| {
        r.split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_owned)
            .collect()
    })
    .unwrap_or_default()
}

/// Applies `spec` to `listings`, returning the matching subset in sorted
/// order. Listings with equal keys keep their input order; listings
/// missing the sort key go last in either direction.
#[must_use]
pub fn filter(listings: Vec<Listing>, spec: &FilterSpec) -> Vec<Listing> {
    let needle = spec
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    let mut kept: Vec<Listing> = listings
        .into_iter()
        .filter(|l| {
            needle
                .as_deref()
                .is_none_or(|n| l.title.to_lowercase().contains(n))
        })
        .filter(|l| facet_accepts(&spec.conditions, Some(&l.condition)))
        .filter(|l| facet_accepts(&spec.technologies, l.technology.as_deref()))
        .filter(|l| facet_accepts(&spec.form_factors, l.form_factor.as_deref()))
        .filter(|l| in_capacity_range(l, spec.min_capacity, spec.max_capacity))
        .collect();

    kept.sort_by(|a, b| compare(a, b, spec.sort, spec.direction));
    kept
}

fn facet_accepts(accepted: &[String], value: Option<&str>) -> bool {
    if accepted.is_empty() {
        return true;
    }
    value.is_some_and(|v| accepted.iter().any(|a| a.eq_ignore_ascii_case(v.trim())))
}

fn in_capacity_range(listing: &Listing, min: Option<f64>, max: Option<f64>) -> bool {
    if min.is_none() && max.is_none() {
        return true;
    }
    let Some(capacity) = listing.metrics.normalized_capacity else {
        return false;
    };
    let factor = listing.category.display_unit().gigabytes_per_unit();
    min.is_none_or(|m| capacity >= m * factor) && max.is_none_or(|m| capacity <= m * factor)
}

enum SortValue<'a> {
    Number(Decimal),
    Float(f64),
    Text(&'a str),
}

fn sort_value(listing: &Listing, key: SortKey) -> Option<SortValue<'_>> {
    match key {
        SortKey::Price => Some(SortValue::Number(listing.price.amount)),
        SortKey::PricePerUnit => listing.metrics.price_per_unit.map(SortValue::Number),
        SortKey::Capacity => listing.metrics.normalized_capacity.map(SortValue::Float),
        SortKey::Title => Some(SortValue::Text(&listing.title)),
        SortKey::Brand => listing.brand.as_deref().map(SortValue::Text),
    }
}

fn compare(a: &Listing, b: &Listing, key: SortKey, direction: SortDirection) -> Ordering {
    match (sort_value(a, key), sort_value(b, key)) {
        (Some(x), Some(y)) => {
            let ordering = match (x, y) {
                (SortValue::Number(x), SortValue::Number(y)) => x.cmp(&y),
                (SortValue::Float(x), SortValue::Float(y)) => x.total_cmp(&y),
                (SortValue::Text(x), SortValue::Text(y)) => {
                    x.to_lowercase().cmp(&y.to_lowercase())
                }
                _ => Ordering::Equal,
            };
            match direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
#[path = "filter_test.rs"]
mod tests;
