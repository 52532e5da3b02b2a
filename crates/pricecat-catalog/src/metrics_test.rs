use std::collections::BTreeMap;

use chrono::{Duration, TimeZone, Utc};
use pricecat_core::{CapacityUnit, Country, Specification};

use super::*;

fn product(category: Category, title: &str, normalized: Option<f64>) -> Product {
    let ts = Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap();
    Product {
        external_id: "B0TEST0001".into(),
        title: title.into(),
        brand: None,
        category,
        capacity: normalized.map(|n| n / 1000.0),
        capacity_unit: Some(CapacityUnit::Tb),
        normalized_capacity: normalized,
        slug: "test-0001".into(),
        prices: BTreeMap::new(),
        localized_titles: BTreeMap::new(),
        specification: Specification::new(),
        last_synced_at: ts,
        created_at: ts,
    }
}

fn usd(cents: i64) -> LocalizedPrice {
    LocalizedPrice {
        amount: Decimal::new(cents, 2),
        currency: "USD".into(),
        price_type: PriceType::Marketplace,
    }
}

fn record(cents: i64, price_type: PriceType, minutes: i64) -> PriceRecord {
    PriceRecord {
        external_id: "B0TEST0001".into(),
        country: Country::Us,
        price: Decimal::new(cents, 2),
        currency: "USD".into(),
        price_type,
        observed_at: Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap()
            + Duration::minutes(minutes),
    }
}

// ---------------------------------------------------------------------------
// Price per unit
// ---------------------------------------------------------------------------

#[test]
fn price_per_gigabyte() {
    let p = product(Category::InternalSsd, "Samsung 990 PRO 2TB", Some(2000.0));
    let m = compute_metrics(&p, &usd(18_000), &ReferencePriceTable::default());
    assert_eq!(m.price_per_unit, Some(Decimal::new(9, 2)));
    assert_eq!(m.price_per_display_unit, Some(Decimal::new(9, 2)));
    assert_eq!(m.normalized_capacity, Some(2000.0));
}

#[test]
fn hard_drives_also_report_per_terabyte() {
    let p = product(Category::InternalHdd, "WD Red Plus 4TB", Some(4000.0));
    let m = compute_metrics(&p, &usd(8_000), &ReferencePriceTable::default());
    assert_eq!(m.price_per_unit, Some(Decimal::new(2, 2)));
    assert_eq!(m.price_per_display_unit, Some(Decimal::new(20, 0)));
    assert_eq!(m.display_capacity, Some(4.0));
}

#[test]
fn missing_or_degenerate_capacity_has_no_price_per_unit() {
    let refs = ReferencePriceTable::default();
    for capacity in [None, Some(0.0), Some(-5.0), Some(f64::NAN), Some(f64::INFINITY)] {
        let p = product(Category::MicroSd, "Card", capacity);
        let m = compute_metrics(&p, &usd(1_000), &refs);
        assert_eq!(m.price_per_unit, None, "capacity {capacity:?}");
        assert_eq!(m.price_per_display_unit, None);
        assert_eq!(m.discount_percent, None);
        assert_eq!(m.normalized_capacity, None);
    }
}

// ---------------------------------------------------------------------------
// Discount
// ---------------------------------------------------------------------------

#[test]
fn discount_against_family_reference() {
    // NVMe reference is 0.08/GB; 0.06/GB is 25% below.
    let p = product(Category::InternalSsd, "Crucial P3 2TB NVMe", Some(2000.0));
    let m = compute_metrics(&p, &usd(12_000), &ReferencePriceTable::default());
    assert_eq!(m.technology_family, TechnologyFamily::Nvme);
    assert_eq!(m.discount_percent, Some(25));
}

#[test]
fn price_above_reference_is_no_discount() {
    let p = product(Category::InternalSsd, "Crucial P3 2TB NVMe", Some(2000.0));
    let m = compute_metrics(&p, &usd(30_000), &ReferencePriceTable::default());
    assert_eq!(m.discount_percent, Some(0));
}

#[test]
fn discount_is_capped_at_99() {
    let p = product(Category::InternalSsd, "Crucial P3 2TB NVMe", Some(2000.0));
    let m = compute_metrics(&p, &usd(1), &ReferencePriceTable::default());
    assert_eq!(m.discount_percent, Some(99));
}

#[test]
fn unknown_currency_has_no_discount() {
    let p = product(Category::InternalSsd, "Crucial P3 2TB NVMe", Some(2000.0));
    let price = LocalizedPrice {
        currency: "JPY".into(),
        ..usd(12_000)
    };
    let m = compute_metrics(&p, &price, &ReferencePriceTable::default());
    assert!(m.price_per_unit.is_some());
    assert_eq!(m.discount_percent, None);
}

#[test]
fn family_follows_category_and_technology() {
    let mut sata = product(Category::InternalSsd, "Samsung 870 EVO 1TB", Some(1000.0));
    assert_eq!(TechnologyFamily::of(&sata), TechnologyFamily::SataSsd);
    sata.specification.set(FacetKey::Technology, "NVMe PCIe 4.0");
    assert_eq!(TechnologyFamily::of(&sata), TechnologyFamily::Nvme);

    let hdd = product(Category::ExternalHdd, "WD Elements 8TB", Some(8000.0));
    assert_eq!(TechnologyFamily::of(&hdd), TechnologyFamily::Hdd);
    let usb = product(Category::UsbFlash, "SanDisk Ultra 64GB", Some(64.0));
    assert_eq!(TechnologyFamily::of(&usb), TechnologyFamily::Flash);
}

#[test]
fn custom_reference_table() {
    let mut refs = ReferencePriceTable::empty();
    refs.set(TechnologyFamily::Hdd, "eur", Decimal::new(4, 2));
    assert_eq!(refs.get(TechnologyFamily::Hdd, "EUR"), Some(Decimal::new(4, 2)));
    assert_eq!(refs.get(TechnologyFamily::Hdd, "USD"), None);
}

// ---------------------------------------------------------------------------
// Trend
// ---------------------------------------------------------------------------

#[test]
fn trend_needs_two_observations() {
    assert_eq!(price_trend(&[], PriceType::Marketplace), None);
    assert_eq!(
        price_trend(&[record(10_000, PriceType::Marketplace, 0)], PriceType::Marketplace),
        None
    );
}

#[test]
fn moves_beyond_two_percent_are_trends() {
    let rising = [
        record(10_000, PriceType::Marketplace, 0),
        record(10_300, PriceType::Marketplace, 60),
    ];
    assert_eq!(price_trend(&rising, PriceType::Marketplace), Some(PriceTrend::Rising));

    let falling = [
        record(10_000, PriceType::Marketplace, 0),
        record(9_700, PriceType::Marketplace, 60),
    ];
    assert_eq!(price_trend(&falling, PriceType::Marketplace), Some(PriceTrend::Falling));
}

#[test]
fn small_moves_are_stable() {
    let history = [
        record(10_000, PriceType::Marketplace, 0),
        record(10_200, PriceType::Marketplace, 60),
    ];
    assert_eq!(price_trend(&history, PriceType::Marketplace), Some(PriceTrend::Stable));
}

#[test]
fn trend_only_compares_the_same_offer_type() {
    let history = [
        record(10_000, PriceType::Marketplace, 0),
        record(5_000, PriceType::Used, 30),
        record(10_500, PriceType::Marketplace, 60),
        record(5_000, PriceType::Used, 90),
    ];
    assert_eq!(price_trend(&history, PriceType::Marketplace), Some(PriceTrend::Rising));
    assert_eq!(price_trend(&history, PriceType::Used), Some(PriceTrend::Stable));
}
