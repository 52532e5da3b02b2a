use std::path::Path;

use super::*;

const SAMPLE: &str = r"
categories:
  - category: internal-ssd
    query: nvme ssd
    priority: 2
  - category: internal-hdd
    query: internal hard drive
    priority: 1
  - category: micro-sd
    query: microsd card
    enabled: false
";

#[test]
fn category_codes_round_trip() {
    for category in Category::ALL {
        assert_eq!(Category::from_code(category.as_str()), Some(category));
    }
}

#[test]
fn category_from_code_accepts_underscores() {
    assert_eq!(Category::from_code("INTERNAL_SSD"), Some(Category::InternalSsd));
    assert_eq!(Category::from_code("tape"), None);
}

#[test]
fn hard_drives_display_in_terabytes() {
    assert_eq!(Category::InternalHdd.display_unit(), CapacityUnit::Tb);
    assert_eq!(Category::ExternalHdd.display_unit(), CapacityUnit::Tb);
    assert_eq!(Category::MicroSd.display_unit(), CapacityUnit::Gb);
}

#[test]
fn parse_sample_sources() {
    let file = parse_category_sources(SAMPLE).expect("valid yaml");
    assert_eq!(file.categories.len(), 3);
    assert!(file.categories[0].enabled, "enabled defaults to true");
    assert!(!file.categories[2].enabled);
}

#[test]
fn run_order_skips_disabled_and_sorts_by_priority() {
    let file = parse_category_sources(SAMPLE).expect("valid yaml");
    let order: Vec<Category> = file.run_order().iter().map(|c| c.category).collect();
    assert_eq!(order, vec![Category::InternalHdd, Category::InternalSsd]);
}

#[test]
fn find_returns_source_for_category() {
    let file = parse_category_sources(SAMPLE).expect("valid yaml");
    let source = file.find(Category::InternalSsd).expect("internal-ssd present");
    assert_eq!(source.query, "nvme ssd");
    assert!(file.find(Category::UsbFlash).is_none());
}

#[test]
fn empty_query_fails_validation() {
    let yaml = "categories:\n  - category: usb-flash\n    query: '  '\n";
    let err = parse_category_sources(yaml).unwrap_err();
    assert!(matches!(err, ConfigError::Validation(msg) if msg.contains("empty query")));
}

#[test]
fn duplicate_category_fails_validation() {
    let yaml = "categories:\n  - category: usb-flash\n    query: a\n  - category: usb-flash\n    query: b\n";
    let err = parse_category_sources(yaml).unwrap_err();
    assert!(matches!(err, ConfigError::Validation(msg) if msg.contains("duplicate")));
}

#[test]
fn unknown_category_fails_parse() {
    let yaml = "categories:\n  - category: floppy\n    query: a\n";
    let err = parse_category_sources(yaml).unwrap_err();
    assert!(matches!(err, ConfigError::CategoriesFileParse(_)));
}

#[test]
fn missing_file_reports_io_error() {
    let err = load_category_sources(Path::new("/nonexistent/categories.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::CategoriesFileIo { .. }));
}

#[test]
fn repository_categories_file_is_valid() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/categories.yaml");
    let file = load_category_sources(&path).expect("config/categories.yaml should be valid");
    assert!(!file.run_order().is_empty());
}
