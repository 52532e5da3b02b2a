use crate::app_config::{AppConfig, Environment};
use crate::products::Country;
use crate::ConfigError;

const DEFAULT_SNAP_POINTS: &str = "1024:1000,2048:2000,4096:4000,8192:8000,16384:16000";

/// Upper bound on any single search or lookup batch the external API accepts.
const MAX_BATCH_SIZE: usize = 100;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a plain
/// `HashMap` lookup.
///
/// # Errors
///
/// Returns [`ConfigError`] if a required variable is missing or any value
/// fails to parse or validate.
pub fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default =
        |var: &str, default: &str| -> String { lookup(var).unwrap_or_else(|_| default.to_string()) };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("PRICECAT_ENV", "development"));

    let bind_addr = or_default("PRICECAT_BIND_ADDR", "0.0.0.0:3000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("PRICECAT_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("PRICECAT_LOG_LEVEL", "info");
    let categories_path = PathBuf::from(or_default(
        "PRICECAT_CATEGORIES_PATH",
        "./config/categories.yaml",
    ));
    let api_key_hash_salt = lookup("PRICECAT_API_KEY_HASH_SALT").ok();
    let catalog_api_key = lookup("PRICECAT_CATALOG_API_KEY")
        .ok()
        .filter(|k| !k.trim().is_empty());
    let catalog_api_url = or_default("PRICECAT_CATALOG_API_URL", "https://api.catalog.example/");

    let db_max_connections = parse_u32("PRICECAT_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("PRICECAT_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("PRICECAT_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let api_request_timeout_secs = parse_u64("PRICECAT_API_REQUEST_TIMEOUT_SECS", "30")?;
    let api_max_retries = parse_u32("PRICECAT_API_MAX_RETRIES", "3")?;
    let api_retry_backoff_base_ms = parse_u64("PRICECAT_API_RETRY_BACKOFF_BASE_MS", "1000")?;

    let daily_token_budget = parse_u64("PRICECAT_DAILY_TOKEN_BUDGET", "20000")?;
    let search_token_cost = parse_u64("PRICECAT_SEARCH_TOKEN_COST", "10")?;
    let item_token_cost = parse_u64("PRICECAT_ITEM_TOKEN_COST", "1")?;
    let max_categories_per_run = parse_usize("PRICECAT_MAX_CATEGORIES_PER_RUN", "3")?;

    let search_limit = parse_u32("PRICECAT_SEARCH_LIMIT", "50")?;
    if search_limit == 0 || search_limit as usize > MAX_BATCH_SIZE {
        return Err(invalid(
            "PRICECAT_SEARCH_LIMIT",
            format!("must be between 1 and {MAX_BATCH_SIZE}"),
        ));
    }

    let lookup_batch_size = parse_usize("PRICECAT_LOOKUP_BATCH_SIZE", "20")?;
    if lookup_batch_size == 0 || lookup_batch_size > MAX_BATCH_SIZE {
        return Err(invalid(
            "PRICECAT_LOOKUP_BATCH_SIZE",
            format!("must be between 1 and {MAX_BATCH_SIZE}"),
        ));
    }

    let freshness_hours = or_default("PRICECAT_FRESHNESS_HOURS", "24")
        .parse::<i64>()
        .map_err(|e| invalid("PRICECAT_FRESHNESS_HOURS", e.to_string()))?;
    if freshness_hours < 0 {
        return Err(invalid(
            "PRICECAT_FRESHNESS_HOURS",
            "must not be negative".to_string(),
        ));
    }

    let inter_call_delay_ms = parse_u64("PRICECAT_INTER_CALL_DELAY_MS", "250")?;
    let max_concurrent_lookups = parse_usize("PRICECAT_MAX_CONCURRENT_LOOKUPS", "1")?;

    let countries = parse_countries(&or_default("PRICECAT_COUNTRIES", "us,uk,de,fr"))
        .map_err(|reason| invalid("PRICECAT_COUNTRIES", reason))?;
    let capacity_snap_points = parse_snap_points(&or_default(
        "PRICECAT_SNAP_POINTS",
        DEFAULT_SNAP_POINTS,
    ))
    .map_err(|reason| invalid("PRICECAT_SNAP_POINTS", reason))?;

    let discovery_cron = or_default("PRICECAT_DISCOVERY_CRON", "0 0 3 * * *");
    let refresh_cron = or_default("PRICECAT_REFRESH_CRON", "0 0 */6 * * *");

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        categories_path,
        api_key_hash_salt,
        catalog_api_key,
        catalog_api_url,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        api_request_timeout_secs,
        api_max_retries,
        api_retry_backoff_base_ms,
        daily_token_budget,
        search_token_cost,
        item_token_cost,
        max_categories_per_run,
        search_limit,
        lookup_batch_size,
        freshness_hours,
        inter_call_delay_ms,
        max_concurrent_lookups,
        countries,
        capacity_snap_points,
        discovery_cron,
        refresh_cron,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

/// Parse a comma-separated list of country codes, rejecting unknown codes
/// and an empty list.
fn parse_countries(raw: &str) -> Result<Vec<Country>, String> {
    let mut countries = Vec::new();
    for code in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let country =
            Country::from_code(code).ok_or_else(|| format!("unknown country code '{code}'"))?;
        if !countries.contains(&country) {
            countries.push(country);
        }
    }
    if countries.is_empty() {
        return Err("at least one country is required".to_string());
    }
    Ok(countries)
}

/// Parse `from:to` pairs, e.g. `"1024:1000,2048:2000"`.
fn parse_snap_points(raw: &str) -> Result<Vec<(u64, u64)>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|pair| {
            let (from, to) = pair
                .split_once(':')
                .ok_or_else(|| format!("expected 'from:to', got '{pair}'"))?;
            let from = from
                .trim()
                .parse::<u64>()
                .map_err(|e| format!("invalid snap source '{from}': {e}"))?;
            let to = to
                .trim()
                .parse::<u64>()
                .map_err(|e| format!("invalid snap target '{to}': {e}"))?;
            Ok((from, to))
        })
        .collect()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
