use super::*;

fn input<'a>(title: &'a str, brand: Option<&'a str>, id: Option<&'a str>) -> SlugInput<'a> {
    SlugInput {
        title,
        brand,
        external_id: id,
        capacity: None,
        unit: None,
    }
}

fn samsung_990() -> SlugInput<'static> {
    SlugInput {
        title: "Samsung 990 PRO 2TB Heatsink",
        brand: Some("Samsung"),
        external_id: Some("B0CBYZ6DD1"),
        capacity: Some(2.0),
        unit: Some(CapacityUnit::Tb),
    }
}

#[test]
fn end_to_end_title_with_brand_capacity_and_id() {
    assert_eq!(generate_slug(&samsung_990()), "samsung-990-pro-2tb-6dd1");
}

#[test]
fn full_id_variant_uses_entire_external_id() {
    assert_eq!(
        generate_slug_with_full_id(&samsung_990()),
        "samsung-990-pro-2tb-b0cbyz6dd1"
    );
}

#[test]
fn same_input_same_slug() {
    let first = generate_slug(&samsung_990());
    let second = generate_slug(&samsung_990());
    assert_eq!(first, second);
}

#[test]
fn distinct_ids_give_distinct_slugs() {
    let a = generate_slug(&input("Kingston NV2 1TB", Some("Kingston"), Some("B0BBWH1R8H")));
    let b = generate_slug(&input("Kingston NV2 1TB", Some("Kingston"), Some("B0BBWH3XYZ")));
    assert_ne!(a, b);
}

#[test]
fn slug_charset_is_url_safe() {
    let slug = generate_slug(&input(
        "Crucial® T705 — 4TB (Heatsink) [PS5 Ready] / Édition spéciale",
        Some("Crucial"),
        Some("B0CV/9X-K2L"),
    ));
    assert!(
        slug.chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'),
        "unexpected characters in {slug}"
    );
    assert!(!slug.starts_with('-') && !slug.ends_with('-'));
    assert!(!slug.contains("--"));
}

#[test]
fn brand_prefix_is_not_duplicated() {
    let slug = generate_slug(&input("Samsung Samsung 870 EVO", Some("Samsung"), None));
    assert_eq!(slug, "samsung-870-evo");
}

#[test]
fn brand_is_prefixed_when_title_lacks_it() {
    let slug = generate_slug(&input("870 EVO", Some("Samsung"), None));
    assert_eq!(slug, "samsung-870-evo");
}

#[test]
fn interface_and_marketing_noise_is_stripped() {
    let slug = generate_slug(&input(
        "WD_BLACK SN850X 2TB NVMe Internal Gaming SSD PCIe Gen4 M.2",
        Some("WD"),
        Some("B0BHJJ9Y77"),
    ));
    assert_eq!(slug, "wd-black-sn850x-2tb-9y77");
}

#[test]
fn french_capacity_spelling_is_normalized() {
    let slug = generate_slug(&SlugInput {
        title: "Disque dur externe 1,5 To",
        brand: None,
        external_id: None,
        capacity: Some(1.5),
        unit: Some(CapacityUnit::Tb),
    });
    assert_eq!(slug, "externe-1-5tb");
}

#[test]
fn capacity_token_appended_when_missing_from_title() {
    let slug = generate_slug(&SlugInput {
        title: "Crucial P3 Plus",
        brand: Some("Crucial"),
        external_id: Some("B0B25NTRGD"),
        capacity: Some(4.0),
        unit: Some(CapacityUnit::Tb),
    });
    assert_eq!(slug, "crucial-p3-plus-4tb-trgd");
}

#[test]
fn empty_title_falls_back_to_placeholder() {
    assert_eq!(generate_slug(&input("", None, None)), "product");
    assert_eq!(generate_slug(&input("", None, Some("X1"))), "product-x1");
}

#[test]
fn all_noise_title_falls_back_to_placeholder() {
    assert_eq!(generate_slug(&input("NVMe SSD", None, None)), "product");
}

#[test]
fn brand_only_title_keeps_brand() {
    assert_eq!(generate_slug(&input("Samsung", Some("Samsung"), None)), "samsung");
}

#[test]
fn long_titles_cut_at_word_boundary() {
    let slug = generate_slug(&input(
        "alpha bravo charlie delta echo foxtrot golf hotel india juliet kilo",
        None,
        None,
    ));
    assert_eq!(slug, "alpha-bravo-charlie-delta-echo-foxtrot-golf-hotel-india");
}

#[test]
fn long_single_word_is_cut_mid_word() {
    let title = "a".repeat(70);
    let slug = generate_slug(&input(&title, None, None));
    assert_eq!(slug.len(), MAX_BASE_LEN);
}

#[test]
fn short_ids_are_used_whole() {
    let slug = generate_slug(&input("Drive", None, Some("ab")));
    assert_eq!(slug, "drive-ab");
}
