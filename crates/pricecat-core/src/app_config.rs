use std::net::SocketAddr;
use std::path::PathBuf;

use crate::products::Country;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub categories_path: PathBuf,
    pub api_key_hash_salt: Option<String>,
    pub catalog_api_key: Option<String>,
    pub catalog_api_url: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub api_request_timeout_secs: u64,
    pub api_max_retries: u32,
    pub api_retry_backoff_base_ms: u64,
    /// Ceiling on external API token spend per UTC day.
    pub daily_token_budget: u64,
    /// Fixed token cost charged for every search call.
    pub search_token_cost: u64,
    /// Token cost per item returned by a search or requested by a lookup.
    pub item_token_cost: u64,
    pub max_categories_per_run: usize,
    pub search_limit: u32,
    pub lookup_batch_size: usize,
    pub freshness_hours: i64,
    pub inter_call_delay_ms: u64,
    pub max_concurrent_lookups: usize,
    pub countries: Vec<Country>,
    /// Binary → decimal capacity snapping table, in gigabytes.
    pub capacity_snap_points: Vec<(u64, u64)>,
    pub discovery_cron: String,
    pub refresh_cron: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("categories_path", &self.categories_path)
            .field("database_url", &"[redacted]")
            .field(
                "api_key_hash_salt",
                &self.api_key_hash_salt.as_ref().map(|_| "[redacted]"),
            )
            .field(
                "catalog_api_key",
                &self.catalog_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("catalog_api_url", &self.catalog_api_url)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("api_request_timeout_secs", &self.api_request_timeout_secs)
            .field("api_max_retries", &self.api_max_retries)
            .field("api_retry_backoff_base_ms", &self.api_retry_backoff_base_ms)
            .field("daily_token_budget", &self.daily_token_budget)
            .field("search_token_cost", &self.search_token_cost)
            .field("item_token_cost", &self.item_token_cost)
            .field("max_categories_per_run", &self.max_categories_per_run)
            .field("search_limit", &self.search_limit)
            .field("lookup_batch_size", &self.lookup_batch_size)
            .field("freshness_hours", &self.freshness_hours)
            .field("inter_call_delay_ms", &self.inter_call_delay_ms)
            .field("max_concurrent_lookups", &self.max_concurrent_lookups)
            .field("countries", &self.countries)
            .field("capacity_snap_points", &self.capacity_snap_points)
            .field("discovery_cron", &self.discovery_cron)
            .field("refresh_cron", &self.refresh_cron)
            .finish()
    }
}
