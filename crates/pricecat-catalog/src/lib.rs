//! Read side of the catalog: per-market price resolution, derived metrics,
//! and the filter/sort engine the presentation layer drives.
//!
//! Everything here is pure. Nothing writes to storage.

pub mod filter;
pub mod listing;
pub mod localize;
pub mod metrics;

pub use filter::{filter, parse_value_list, FilterSpec, SortDirection, SortKey};
pub use listing::{build_listings, Listing};
pub use localize::{localize, LocalizedPrice, LocalizedProduct};
pub use metrics::{
    compute_metrics, price_trend, PriceTrend, ProductMetrics, ReferencePriceTable,
    TechnologyFamily,
};
