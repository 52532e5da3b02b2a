pub mod app_config;
pub mod categories;
pub mod config;
pub mod products;
pub mod store;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use categories::{
    load_category_sources, parse_category_sources, Category, CategorySource, CategorySourcesFile,
};
pub use config::{build_app_config, load_app_config, load_app_config_from_env};
pub use products::{
    CapacityUnit, Country, CountryPrices, FacetKey, PriceRecord, PriceType, Product,
    Specification,
};
pub use store::{CatalogStore, StoreError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read category sources file {path}: {source}")]
    CategoriesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse category sources file: {0}")]
    CategoriesFileParse(#[source] serde_yaml::Error),

    #[error("category sources validation failed: {0}")]
    Validation(String),
}
