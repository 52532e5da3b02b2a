use chrono::{Duration, TimeZone};
use pricecat_core::PriceType;
use rust_decimal::Decimal;

use super::*;

fn ts(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, day, 8, 0, 0).unwrap()
}

fn product(id: &str, slug: &str, category: Category, synced: DateTime<Utc>) -> Product {
    Product {
        external_id: id.to_owned(),
        title: format!("Drive {id}"),
        brand: None,
        category,
        capacity: Some(1.0),
        capacity_unit: Some(pricecat_core::CapacityUnit::Tb),
        normalized_capacity: Some(1000.0),
        slug: slug.to_owned(),
        prices: BTreeMap::new(),
        localized_titles: BTreeMap::new(),
        specification: pricecat_core::Specification::new(),
        last_synced_at: synced,
        created_at: synced,
    }
}

fn record(id: &str, at: DateTime<Utc>, cents: i64) -> PriceRecord {
    PriceRecord {
        external_id: id.to_owned(),
        country: Country::Us,
        price: Decimal::new(cents, 2),
        currency: "USD".to_owned(),
        price_type: PriceType::Marketplace,
        observed_at: at,
    }
}

#[tokio::test]
async fn upsert_is_keyed_by_external_id() {
    let store = MemoryCatalog::new();
    let mut p = product("A1", "drive-a1", Category::InternalSsd, ts(1));
    store.upsert_product(&p).await.unwrap();

    p.title = "Renamed".to_owned();
    p.created_at = ts(5);
    store.upsert_product(&p).await.unwrap();

    let all = store.all_products().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].title, "Renamed");
    assert_eq!(all[0].created_at, ts(1), "created_at survives upserts");
}

#[tokio::test]
async fn slug_held_by_another_product_conflicts() {
    let store = MemoryCatalog::new();
    store
        .upsert_product(&product("A1", "same", Category::InternalSsd, ts(1)))
        .await
        .unwrap();
    let err = store
        .upsert_product(&product("B2", "same", Category::InternalSsd, ts(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));
}

#[tokio::test]
async fn find_by_slug_and_id() {
    let store = MemoryCatalog::with_products([product("A1", "drive-a1", Category::MicroSd, ts(1))]);
    assert!(store.find_product("A1").await.unwrap().is_some());
    assert!(store.find_by_slug("drive-a1").await.unwrap().is_some());
    assert!(store.find_by_slug("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn products_by_category_filters() {
    let store = MemoryCatalog::with_products([
        product("A1", "a", Category::MicroSd, ts(1)),
        product("B2", "b", Category::InternalHdd, ts(1)),
    ]);
    let micro = store.products_by_category(Category::MicroSd).await.unwrap();
    assert_eq!(micro.len(), 1);
    assert_eq!(micro[0].external_id, "A1");
}

#[tokio::test]
async fn stale_products_oldest_first_and_limited() {
    let store = MemoryCatalog::with_products([
        product("A1", "a", Category::MicroSd, ts(3)),
        product("B2", "b", Category::MicroSd, ts(1)),
        product("C3", "c", Category::MicroSd, ts(2)),
        product("D4", "d", Category::MicroSd, ts(10)),
    ]);
    let stale = store.stale_products(ts(5), 2).await.unwrap();
    let ids: Vec<&str> = stale.iter().map(|p| p.external_id.as_str()).collect();
    assert_eq!(ids, vec!["B2", "C3"]);
}

#[tokio::test]
async fn price_history_is_append_only_and_ordered() {
    let store = MemoryCatalog::with_products([product("A1", "a", Category::MicroSd, ts(1))]);
    store.insert_price_record(&record("A1", ts(3), 100)).await.unwrap();
    store.insert_price_record(&record("A1", ts(2), 120)).await.unwrap();
    store
        .insert_price_record(&record("A1", ts(2) + Duration::hours(1), 120))
        .await
        .unwrap();

    let history = store.price_history("A1", Country::Us).await.unwrap();
    assert_eq!(history.len(), 3, "identical prices are still recorded");
    assert_eq!(history[0].observed_at, ts(2));
    assert_eq!(history[2].observed_at, ts(3));
    assert!(store.price_history("A1", Country::De).await.unwrap().is_empty());
}

#[tokio::test]
async fn price_record_for_unknown_product_is_rejected() {
    let store = MemoryCatalog::new();
    let err = store
        .insert_price_record(&record("ZZ", ts(1), 1))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));
}

#[tokio::test]
async fn offline_store_reports_unavailable() {
    let store = MemoryCatalog::new();
    store.set_offline(true);
    let err = store.find_product("A1").await.unwrap_err();
    assert!(matches!(err, StoreError::Unavailable(_)));

    store.set_offline(false);
    assert!(store.find_product("A1").await.unwrap().is_none());
}
