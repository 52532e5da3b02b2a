//! Read-only commands: budget status, listings, and run history.

use clap::Args;
use pricecat_catalog::{
    build_listings, filter, parse_value_list, FilterSpec, ReferencePriceTable, SortDirection,
    SortKey,
};
use pricecat_core::{AppConfig, CatalogStore, Category, Country};
use pricecat_db::PgCatalog;
use pricecat_sync::TokenBudget;

use crate::sync::tokens_used_today;

#[derive(Debug, Args)]
pub struct ListingsArgs {
    /// Market code (us, uk, de, fr, ...)
    #[arg(long, default_value = "us")]
    pub country: String,
    /// Restrict to one category (e.g. internal-hdd)
    #[arg(long)]
    pub category: Option<String>,
    /// Case-insensitive title search
    #[arg(long)]
    pub search: Option<String>,
    /// Comma-separated conditions (new, used, ...)
    #[arg(long)]
    pub condition: Option<String>,
    /// Comma-separated technologies (nvme, sata, ...)
    #[arg(long)]
    pub technology: Option<String>,
    /// Comma-separated form factors
    #[arg(long)]
    pub form_factor: Option<String>,
    /// Minimum capacity in the category display unit
    #[arg(long)]
    pub min_capacity: Option<f64>,
    /// Maximum capacity in the category display unit
    #[arg(long)]
    pub max_capacity: Option<f64>,
    #[arg(long, default_value = "price-per-unit")]
    pub sort: String,
    #[arg(long, default_value = "asc")]
    pub direction: String,
    #[arg(long, default_value = "20")]
    pub limit: usize,
}

impl ListingsArgs {
    pub(crate) fn filter_spec(&self) -> FilterSpec {
        FilterSpec {
            search: self.search.clone(),
            conditions: parse_value_list(self.condition.as_deref()),
            technologies: parse_value_list(self.technology.as_deref()),
            form_factors: parse_value_list(self.form_factor.as_deref()),
            min_capacity: self.min_capacity,
            max_capacity: self.max_capacity,
            sort: SortKey::from_code(&self.sort),
            direction: SortDirection::from_code(&self.direction),
        }
    }
}

/// Prints today's token status, rebuilt from completed runs.
///
/// # Errors
///
/// Returns an error if the usage query fails.
pub(crate) async fn run_budget(pool: &sqlx::PgPool, config: &AppConfig) -> anyhow::Result<()> {
    let budget = TokenBudget::new(config.daily_token_budget);
    let used = tokens_used_today(pool).await?;
    if used > 0 {
        budget.record_usage(used);
    }
    let status = budget.token_status();
    println!(
        "tokens used today: {} / {} ({:.1}%), remaining {}{}",
        status.used_today,
        status.ceiling,
        status.percent_used,
        status.remaining,
        if status.can_proceed { "" } else { " (exhausted)" }
    );
    Ok(())
}

/// # Errors
///
/// Returns an error if the country or category code is unknown, or the
/// catalog query fails.
pub(crate) async fn run_listings(pool: &sqlx::PgPool, args: &ListingsArgs) -> anyhow::Result<()> {
    let country = Country::from_code(&args.country)
        .ok_or_else(|| anyhow::anyhow!("unknown country '{}'", args.country))?;
    let categories = match args.category.as_deref() {
        Some(code) => vec![Category::from_code(code)
            .ok_or_else(|| anyhow::anyhow!("unknown category '{code}'"))?],
        None => Category::ALL.to_vec(),
    };

    let store = PgCatalog::new(pool.clone());
    let mut products = Vec::new();
    for category in categories {
        products.extend(store.products_by_category(category).await?);
    }

    let listings = filter(
        build_listings(&products, country, &ReferencePriceTable::default()),
        &args.filter_spec(),
    );
    if listings.is_empty() {
        println!("no listings match");
        return Ok(());
    }

    for listing in listings.iter().take(args.limit) {
        let per_unit = listing
            .metrics
            .price_per_display_unit
            .map_or_else(|| "-".to_string(), |p| p.to_string());
        println!(
            "{:>10} {:<4} {:>10}/{:<3} {:<14} {}",
            listing.price.amount,
            listing.price.currency,
            per_unit,
            listing.category.display_unit().as_str(),
            listing.category.as_str(),
            listing.title
        );
    }
    println!("{} of {} listings", listings.len().min(args.limit), listings.len());
    Ok(())
}

/// # Errors
///
/// Returns an error if the query fails.
pub(crate) async fn run_runs(pool: &sqlx::PgPool, limit: i64) -> anyhow::Result<()> {
    let runs = pricecat_db::list_sync_runs(pool, limit.clamp(1, 100)).await?;
    if runs.is_empty() {
        println!("no sync runs recorded");
        return Ok(());
    }
    for run in runs {
        println!(
            "{} {:<9} {:<9} {:<10} {:<13} items={} tokens={} errors={}{}",
            run.created_at.format("%Y-%m-%d %H:%M"),
            run.mode,
            run.status,
            run.trigger_source,
            run.category.as_deref().unwrap_or("-"),
            run.items_processed,
            run.tokens_used,
            run.error_count,
            run.error_message
                .map(|m| format!(" ({m})"))
                .unwrap_or_default()
        );
    }
    Ok(())
}
