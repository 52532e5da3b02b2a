use super::*;

fn parse(text: &str) -> Option<ParsedCapacity> {
    CapacityParser::default().parse(text)
}

fn assert_gb(text: &str, expected: f64) {
    let parsed = parse(text).unwrap_or_else(|| panic!("expected {text:?} to parse"));
    assert!(
        (parsed.normalized_gb - expected).abs() < 1e-9,
        "{text:?}: expected {expected} GB, got {}",
        parsed.normalized_gb
    );
}

// ---------------------------------------------------------------------------
// Unit recognition and synonyms
// ---------------------------------------------------------------------------

#[test]
fn terabyte_family_multiplies_by_thousand() {
    assert_gb("2 TB", 2000.0);
    assert_gb("2TB", 2000.0);
    assert_gb("1To", 1000.0);
    assert_gb("1.5tb", 1500.0);
}

#[test]
fn gigabyte_family_passes_through() {
    assert_gb("500GB", 500.0);
    assert_gb("128Go", 128.0);
    assert_gb("512G", 512.0);
    assert_gb("256 gb", 256.0);
}

#[test]
fn synonyms_fold_to_canonical_units() {
    assert_eq!(parse("1To").unwrap().unit, CapacityUnit::Tb);
    assert_eq!(parse("128Go").unwrap().unit, CapacityUnit::Gb);
    assert_eq!(parse("512G").unwrap().unit, CapacityUnit::Gb);
}

#[test]
fn value_keeps_the_written_magnitude() {
    let parsed = parse("Crucial P3 Plus 4TB").unwrap();
    assert!((parsed.value - 4.0).abs() < f64::EPSILON);
    assert_eq!(parsed.unit, CapacityUnit::Tb);
}

#[test]
fn decimal_comma_is_accepted() {
    assert_gb("Disque dur 1,5 To", 1500.0);
    assert_gb("1,5 To", 1500.0);
    assert_gb("2,25TB", 2250.0);
}

#[test]
fn thousands_separator_is_not_a_decimal_comma() {
    assert_gb("Seagate 1,024GB drive", 1000.0);
    assert_gb("2,048 GB", 2000.0);
    assert_gb("1,500GB", 1500.0);
    assert_gb("1,0245GB", 1.0245);
}

#[test]
fn capacity_embedded_in_title() {
    assert_gb("Samsung 990 PRO 2TB Heatsink", 2000.0);
    assert_gb("WD Blue SN580 1TB NVMe M.2", 1000.0);
    assert_gb("SanDisk Extreme 256GB microSDXC", 256.0);
}

// ---------------------------------------------------------------------------
// Negative lookahead: unit prefixes of unrelated tokens
// ---------------------------------------------------------------------------

#[test]
fn bandwidth_tokens_never_parse() {
    assert!(parse("400 Gbps").is_none());
    assert!(parse("10Gbit").is_none());
    assert!(parse("10 Gbit/s Ethernet").is_none());
    assert!(parse("SATA 6Gb/s").is_none());
    assert!(parse("7.4 GB/s read").is_none());
}

#[test]
fn bandwidth_token_does_not_shadow_real_capacity() {
    assert_gb("USB 3.2 10Gbps portable 2TB", 2000.0);
    assert_gb("Crucial BX500 SATA 6Gb/s 1TB", 1000.0);
    assert_gb("Crucial BX500 SATA 6Gb/s 1TB 2.5 Inch SSD", 1000.0);
}

#[test]
fn lowercase_french_units_are_not_units() {
    // "to"/"go" only count in their capitalized French form.
    assert!(parse("up 2 to date").is_none());
}

#[test]
fn strings_without_capacity_are_unparsable() {
    assert!(parse("").is_none());
    assert!(parse("Heatsink for M.2 drives").is_none());
    assert!(parse("0GB").is_none());
}

// ---------------------------------------------------------------------------
// Binary → decimal snapping
// ---------------------------------------------------------------------------

#[test]
fn binary_artifacts_snap_to_decimal() {
    assert_gb("1024GB", 1000.0);
    assert_gb("2048GB", 2000.0);
    assert_gb("4096 GB", 4000.0);
    assert_gb("8192GB", 8000.0);
    assert_gb("16384GB", 16000.0);
}

#[test]
fn non_snap_points_pass_through() {
    assert_gb("1000GB", 1000.0);
    assert_gb("512GB", 512.0);
    assert_gb("3TB", 3000.0);
    assert_gb("32768GB", 32768.0);
}

#[test]
fn snapping_keeps_written_value() {
    let parsed = parse("1024GB").unwrap();
    assert!((parsed.value - 1024.0).abs() < f64::EPSILON);
    assert!((parsed.normalized_gb - 1000.0).abs() < f64::EPSILON);
}

#[test]
fn custom_snap_table_is_honored() {
    let parser = CapacityParser::new(SnapTable::new(vec![(32768, 32000)]));
    let big = parser.parse("32768GB").unwrap();
    assert!((big.normalized_gb - 32000.0).abs() < f64::EPSILON);
    // The default points are gone from a custom table.
    let kib = parser.parse("1024GB").unwrap();
    assert!((kib.normalized_gb - 1024.0).abs() < f64::EPSILON);
}

// ---------------------------------------------------------------------------
// Dual-source extraction
// ---------------------------------------------------------------------------

#[test]
fn extract_prefers_specification() {
    let parser = CapacityParser::default();
    let (parsed, source) = parser
        .extract(Some("4 TB"), "Some drive 2TB")
        .expect("capacity");
    assert_eq!(source, CapacitySource::Specification);
    assert!((parsed.normalized_gb - 4000.0).abs() < f64::EPSILON);
}

#[test]
fn extract_falls_back_to_title_when_spec_missing_or_unparsable() {
    let parser = CapacityParser::default();

    let (parsed, source) = parser.extract(None, "Drive 2048GB").expect("capacity");
    assert_eq!(source, CapacitySource::Title);
    assert!((parsed.normalized_gb - 2000.0).abs() < f64::EPSILON);

    let (_, source) = parser
        .extract(Some("unknown"), "Drive 1TB")
        .expect("capacity");
    assert_eq!(source, CapacitySource::Title);
}

#[test]
fn extract_returns_none_when_both_sources_fail() {
    let parser = CapacityParser::default();
    assert!(parser.extract(Some("n/a"), "25 Gbps adapter").is_none());
}
