//! Wire types for the external catalog API.
//!
//! Both `/search` and `/lookup` return the same envelope:
//!
//! ```json
//! {
//!   "items": [ ... ],
//!   "tokensConsumed": 12,
//!   "tokensLeft": 19876,
//!   "error": null
//! }
//! ```
//!
//! Prices arrive as integer minor units (cents). A negative value or `null`
//! means the item has no offer of that type in the requested market.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Deserialize;

/// Response envelope shared by search and lookup.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiBatch {
    #[serde(default)]
    pub items: Vec<ApiItem>,

    /// Tokens this call was billed.
    #[serde(default)]
    pub tokens_consumed: Option<u64>,

    /// Remaining tokens the API reports for the key. Used to reconcile the
    /// local budget estimate.
    #[serde(default)]
    pub tokens_left: Option<u64>,

    /// Application-level error message. Set with a 200 status on bad queries.
    #[serde(default)]
    pub error: Option<String>,
}

/// A single catalog item as returned by the API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiItem {
    /// Source identifier (ASIN-like), stable across calls.
    pub id: String,

    pub title: String,

    #[serde(default)]
    pub brand: Option<String>,

    /// Title in the requested market's language, when it differs.
    #[serde(default)]
    pub localized_title: Option<String>,

    /// Structured size field, e.g. `"2 TB"`. Often missing or free text.
    #[serde(default)]
    pub capacity: Option<String>,

    #[serde(default)]
    pub prices: ApiPrices,

    /// Loose attribute map (`"technology": "NVMe"`, `"form_factor": "M.2"`).
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

/// Per-offer-type prices in minor units.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ApiPrices {
    #[serde(default)]
    pub marketplace: Option<i64>,
    #[serde(default)]
    pub new: Option<i64>,
    #[serde(default)]
    pub used: Option<i64>,
}

impl ApiPrices {
    /// Converts a raw minor-unit value to a price, treating negatives as
    /// "no offer".
    #[must_use]
    pub fn from_cents(cents: Option<i64>) -> Option<Decimal> {
        cents.filter(|c| *c >= 0).map(|c| Decimal::new(c, 2))
    }

    #[must_use]
    pub fn marketplace(&self) -> Option<Decimal> {
        Self::from_cents(self.marketplace)
    }

    #[must_use]
    pub fn new_price(&self) -> Option<Decimal> {
        Self::from_cents(self.new)
    }

    #[must_use]
    pub fn used(&self) -> Option<Decimal> {
        Self::from_cents(self.used)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn envelope_deserializes_camel_case_fields() {
        let raw = r#"{
            "items": [{
                "id": "B0CBYZ6DD1",
                "title": "Samsung 990 PRO 2TB",
                "brand": "Samsung",
                "capacity": "2 TB",
                "prices": {"marketplace": 17999, "new": -1, "used": null},
                "attributes": {"technology": "NVMe"}
            }],
            "tokensConsumed": 11,
            "tokensLeft": 1989
        }"#;
        let batch: ApiBatch = serde_json::from_str(raw).unwrap();
        assert_eq!(batch.tokens_consumed, Some(11));
        assert_eq!(batch.tokens_left, Some(1989));
        assert!(batch.error.is_none());

        let item = &batch.items[0];
        assert_eq!(item.id, "B0CBYZ6DD1");
        assert_eq!(item.capacity.as_deref(), Some("2 TB"));
        assert_eq!(item.prices.marketplace(), Some(dec("179.99")));
        assert_eq!(item.prices.new_price(), None);
        assert_eq!(item.prices.used(), None);
        assert_eq!(item.attributes.get("technology").map(String::as_str), Some("NVMe"));
    }

    #[test]
    fn missing_optional_fields_default() {
        let raw = r#"{"items": [{"id": "X", "title": "Bare"}]}"#;
        let batch: ApiBatch = serde_json::from_str(raw).unwrap();
        let item = &batch.items[0];
        assert!(item.brand.is_none());
        assert!(item.prices.marketplace.is_none());
        assert!(item.attributes.is_empty());
        assert!(batch.tokens_left.is_none());
    }

    #[test]
    fn zero_cents_is_a_real_price() {
        assert_eq!(ApiPrices::from_cents(Some(0)), Some(Decimal::ZERO));
        assert_eq!(ApiPrices::from_cents(Some(-1)), None);
    }
}
