//! Canonical catalog entities shared by ingestion, storage, and the read side.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::categories::Category;

/// A marketplace the catalog publishes prices for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Country {
    Us,
    Uk,
    De,
    Fr,
    It,
    Es,
    Ca,
}

impl Country {
    pub const ALL: [Country; 7] = [
        Country::Us,
        Country::Uk,
        Country::De,
        Country::Fr,
        Country::It,
        Country::Es,
        Country::Ca,
    ];

    /// Lowercase two-letter code used in URLs, config, and storage.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Country::Us => "us",
            Country::Uk => "uk",
            Country::De => "de",
            Country::Fr => "fr",
            Country::It => "it",
            Country::Es => "es",
            Country::Ca => "ca",
        }
    }

    /// ISO 4217 currency the marketplace prices in.
    #[must_use]
    pub fn currency(self) -> &'static str {
        match self {
            Country::Us => "USD",
            Country::Uk => "GBP",
            Country::De | Country::Fr | Country::It | Country::Es => "EUR",
            Country::Ca => "CAD",
        }
    }

    /// Case-insensitive lookup by code. `gb` is accepted as an alias for `uk`.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        let lower = code.trim().to_ascii_lowercase();
        if lower == "gb" {
            return Some(Country::Uk);
        }
        Country::ALL.into_iter().find(|c| c.code() == lower)
    }
}

impl std::fmt::Display for Country {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Canonical capacity unit after synonym folding (`To` → `TB`, `Go`/`G` → `GB`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CapacityUnit {
    #[serde(rename = "GB")]
    Gb,
    #[serde(rename = "TB")]
    Tb,
}

impl CapacityUnit {
    /// Multiplier from this unit into the gigabyte base unit.
    #[must_use]
    pub fn gigabytes_per_unit(self) -> f64 {
        match self {
            CapacityUnit::Gb => 1.0,
            CapacityUnit::Tb => 1000.0,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CapacityUnit::Gb => "GB",
            CapacityUnit::Tb => "TB",
        }
    }

    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "GB" => Some(CapacityUnit::Gb),
            "TB" => Some(CapacityUnit::Tb),
            _ => None,
        }
    }
}

impl std::fmt::Display for CapacityUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which offer a price observation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceType {
    /// The marketplace's own first-party offer.
    Marketplace,
    /// Lowest third-party new offer.
    New,
    /// Lowest third-party used offer.
    Used,
}

impl PriceType {
    /// Resolution order when localizing a price.
    pub const PRECEDENCE: [PriceType; 3] = [PriceType::Marketplace, PriceType::New, PriceType::Used];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PriceType::Marketplace => "marketplace",
            PriceType::New => "new",
            PriceType::Used => "used",
        }
    }

    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "marketplace" => Some(PriceType::Marketplace),
            "new" => Some(PriceType::New),
            "used" => Some(PriceType::Used),
            _ => None,
        }
    }

    /// Primary marketplace price vs. secondary (new/used) offers.
    #[must_use]
    pub fn is_secondary(self) -> bool {
        !matches!(self, PriceType::Marketplace)
    }
}

/// Latest known prices for one product in one country. Any slot may be
/// `None`; a country with every slot empty is unpriced, not free.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryPrices {
    pub currency: String,
    pub marketplace: Option<Decimal>,
    pub new: Option<Decimal>,
    pub used: Option<Decimal>,
}

impl CountryPrices {
    #[must_use]
    pub fn empty(country: Country) -> Self {
        Self {
            currency: country.currency().to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn get(&self, price_type: PriceType) -> Option<Decimal> {
        match price_type {
            PriceType::Marketplace => self.marketplace,
            PriceType::New => self.new,
            PriceType::Used => self.used,
        }
    }

    pub fn set(&mut self, price_type: PriceType, value: Option<Decimal>) {
        let slot = match price_type {
            PriceType::Marketplace => &mut self.marketplace,
            PriceType::New => &mut self.new,
            PriceType::Used => &mut self.used,
        };
        *slot = value;
    }

    #[must_use]
    pub fn is_unpriced(&self) -> bool {
        self.marketplace.is_none() && self.new.is_none() && self.used.is_none()
    }
}

/// Closed set of specification keys the catalog understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FacetKey {
    Capacity,
    Condition,
    Technology,
    FormFactor,
    Interface,
    ReadSpeed,
    WriteSpeed,
    Model,
    Color,
}

impl FacetKey {
    pub const ALL: [FacetKey; 9] = [
        FacetKey::Capacity,
        FacetKey::Condition,
        FacetKey::Technology,
        FacetKey::FormFactor,
        FacetKey::Interface,
        FacetKey::ReadSpeed,
        FacetKey::WriteSpeed,
        FacetKey::Model,
        FacetKey::Color,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FacetKey::Capacity => "capacity",
            FacetKey::Condition => "condition",
            FacetKey::Technology => "technology",
            FacetKey::FormFactor => "form_factor",
            FacetKey::Interface => "interface",
            FacetKey::ReadSpeed => "read_speed",
            FacetKey::WriteSpeed => "write_speed",
            FacetKey::Model => "model",
            FacetKey::Color => "color",
        }
    }

    /// Matches a raw attribute name, tolerating case and `-`/space separators.
    #[must_use]
    pub fn from_key(raw: &str) -> Option<Self> {
        let key = raw.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        FacetKey::ALL.into_iter().find(|k| k.as_str() == key)
    }
}

/// Free-text specification attributes, split into recognized facets and an
/// `unknown` bucket that round-trips attributes the catalog does not model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, String>",
    into = "BTreeMap<String, String>"
)]
pub struct Specification {
    known: BTreeMap<FacetKey, String>,
    unknown: BTreeMap<String, String>,
}

impl Specification {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an attribute under its facet key, or under `unknown` when the
    /// key is not recognized. Blank values are dropped.
    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        let value: String = value.into();
        let value = value.trim();
        if value.is_empty() {
            return;
        }
        match FacetKey::from_key(key) {
            Some(facet) => {
                self.known.insert(facet, value.to_string());
            }
            None => {
                self.unknown
                    .insert(key.trim().to_string(), value.to_string());
            }
        }
    }

    pub fn set(&mut self, facet: FacetKey, value: impl Into<String>) {
        self.known.insert(facet, value.into());
    }

    #[must_use]
    pub fn get(&self, facet: FacetKey) -> Option<&str> {
        self.known.get(&facet).map(String::as_str)
    }

    #[must_use]
    pub fn unknown(&self, key: &str) -> Option<&str> {
        self.unknown.get(key).map(String::as_str)
    }

    pub fn known(&self) -> impl Iterator<Item = (FacetKey, &str)> {
        self.known.iter().map(|(k, v)| (*k, v.as_str()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.known.is_empty() && self.unknown.is_empty()
    }
}

impl From<BTreeMap<String, String>> for Specification {
    fn from(raw: BTreeMap<String, String>) -> Self {
        let mut spec = Specification::new();
        for (key, value) in raw {
            spec.insert(&key, value);
        }
        spec
    }
}

impl From<Specification> for BTreeMap<String, String> {
    fn from(spec: Specification) -> Self {
        let mut out = spec.unknown;
        for (facet, value) in spec.known {
            out.insert(facet.as_str().to_string(), value);
        }
        out
    }
}

/// The canonical catalog entity, keyed by `external_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Source identifier; immutable once the product exists.
    pub external_id: String,
    pub title: String,
    pub brand: Option<String>,
    pub category: Category,
    /// Parsed magnitude in `capacity_unit`, e.g. `2.0` for "2TB".
    pub capacity: Option<f64>,
    pub capacity_unit: Option<CapacityUnit>,
    /// Capacity in gigabytes after snapping; the price-per-unit denominator.
    pub normalized_capacity: Option<f64>,
    /// Globally unique URL identifier.
    pub slug: String,
    pub prices: BTreeMap<Country, CountryPrices>,
    #[serde(default)]
    pub localized_titles: BTreeMap<Country, String>,
    #[serde(default)]
    pub specification: Specification,
    pub last_synced_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Product {
    #[must_use]
    pub fn prices_for(&self, country: Country) -> Option<&CountryPrices> {
        self.prices.get(&country)
    }

    /// Records the latest observation for `(country, price_type)`, creating
    /// the country entry on first sight.
    pub fn set_price(&mut self, country: Country, price_type: PriceType, value: Option<Decimal>) {
        self.prices
            .entry(country)
            .or_insert_with(|| CountryPrices::empty(country))
            .set(price_type, value);
    }

    #[must_use]
    pub fn title_for(&self, country: Country) -> &str {
        self.localized_titles
            .get(&country)
            .map_or(self.title.as_str(), String::as_str)
    }
}

/// A point-in-time price observation. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub external_id: String,
    pub country: Country,
    pub price: Decimal,
    pub currency: String,
    pub price_type: PriceType,
    pub observed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn make_product() -> Product {
        let ts = Utc.with_ymd_and_hms(2026, 1, 10, 12, 0, 0).unwrap();
        Product {
            external_id: "B0CBYZ6DD1".to_string(),
            title: "Samsung 990 PRO 2TB Heatsink".to_string(),
            brand: Some("Samsung".to_string()),
            category: Category::InternalSsd,
            capacity: Some(2.0),
            capacity_unit: Some(CapacityUnit::Tb),
            normalized_capacity: Some(2000.0),
            slug: "samsung-990-pro-2tb-6dd1".to_string(),
            prices: BTreeMap::new(),
            localized_titles: BTreeMap::new(),
            specification: Specification::new(),
            last_synced_at: ts,
            created_at: ts,
        }
    }

    #[test]
    fn country_codes_round_trip() {
        for country in Country::ALL {
            assert_eq!(Country::from_code(country.code()), Some(country));
        }
    }

    #[test]
    fn country_lookup_is_case_insensitive_and_accepts_gb() {
        assert_eq!(Country::from_code("DE"), Some(Country::De));
        assert_eq!(Country::from_code("gb"), Some(Country::Uk));
        assert_eq!(Country::from_code("xx"), None);
    }

    #[test]
    fn eurozone_countries_share_currency() {
        assert_eq!(Country::Fr.currency(), "EUR");
        assert_eq!(Country::De.currency(), "EUR");
        assert_eq!(Country::Uk.currency(), "GBP");
    }

    #[test]
    fn capacity_unit_multipliers() {
        assert!((CapacityUnit::Tb.gigabytes_per_unit() - 1000.0).abs() < f64::EPSILON);
        assert!((CapacityUnit::Gb.gigabytes_per_unit() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn set_price_creates_country_entry_with_local_currency() {
        let mut product = make_product();
        product.set_price(Country::Fr, PriceType::New, Some(Decimal::new(15999, 2)));
        let fr = product.prices_for(Country::Fr).expect("fr prices");
        assert_eq!(fr.currency, "EUR");
        assert_eq!(fr.new, Some(Decimal::new(15999, 2)));
        assert!(fr.marketplace.is_none());
    }

    #[test]
    fn country_prices_unpriced_when_all_slots_empty() {
        let mut prices = CountryPrices::empty(Country::Us);
        assert!(prices.is_unpriced());
        prices.set(PriceType::Used, Some(Decimal::ONE));
        assert!(!prices.is_unpriced());
    }

    #[test]
    fn title_for_falls_back_to_canonical_title() {
        let mut product = make_product();
        product
            .localized_titles
            .insert(Country::De, "Samsung 990 PRO 2 TB Kühlkörper".to_string());
        assert_eq!(product.title_for(Country::De), "Samsung 990 PRO 2 TB Kühlkörper");
        assert_eq!(product.title_for(Country::Us), "Samsung 990 PRO 2TB Heatsink");
    }

    #[test]
    fn specification_routes_known_and_unknown_keys() {
        let mut spec = Specification::new();
        spec.insert("Form-Factor", "M.2 2280");
        spec.insert("technology", "NVMe");
        spec.insert("warranty", "5 years");
        spec.insert("color", "   ");

        assert_eq!(spec.get(FacetKey::FormFactor), Some("M.2 2280"));
        assert_eq!(spec.get(FacetKey::Technology), Some("NVMe"));
        assert_eq!(spec.unknown("warranty"), Some("5 years"));
        assert!(spec.get(FacetKey::Color).is_none());
    }

    #[test]
    fn specification_serializes_as_flat_map() {
        let mut spec = Specification::new();
        spec.set(FacetKey::Interface, "PCIe 4.0 x4");
        spec.insert("warranty", "5 years");

        let json = serde_json::to_value(&spec).expect("serialize");
        assert_eq!(json["interface"], "PCIe 4.0 x4");
        assert_eq!(json["warranty"], "5 years");

        let decoded: Specification = serde_json::from_value(json).expect("deserialize");
        assert_eq!(decoded, spec);
    }
}
