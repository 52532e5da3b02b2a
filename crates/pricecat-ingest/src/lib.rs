//! Catalog API client and the normalization pipeline that turns raw items
//! into catalog products.

pub mod capacity;
pub mod client;
pub mod error;
pub mod normalize;
mod rate_limit;
pub mod slug;
pub mod types;

pub use capacity::{CapacityParser, CapacitySource, ParsedCapacity, SnapTable};
pub use client::{CatalogApiClient, MAX_BATCH};
pub use error::IngestError;
pub use normalize::{apply_item_update, new_product_from_item, price_observations, ItemUpdate};
pub use slug::{generate_slug, generate_slug_with_full_id, SlugInput};
pub use types::{ApiBatch, ApiItem, ApiPrices};
