mod report;
mod sync;

use clap::{Parser, Subcommand, ValueEnum};
use pricecat_sync::SyncMode;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "pricecat-cli")]
#[command(about = "Storage price catalog command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one discovery or refresh pass against the external catalog
    Sync {
        #[arg(long, value_enum, default_value_t = ModeArg::Discovery)]
        mode: ModeArg,
        /// Restrict the run to one category (e.g. internal-ssd)
        #[arg(long)]
        category: Option<String>,
        /// Search size (discovery) or number of stale products (refresh)
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show today's token usage against the daily ceiling
    Budget,
    /// Apply pending database migrations
    Migrate,
    /// Print filtered, sorted listings for one market
    Listings(report::ListingsArgs),
    /// Show recent sync runs
    Runs {
        #[arg(long, default_value = "10")]
        limit: i64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Discovery,
    Refresh,
}

impl From<ModeArg> for SyncMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Discovery => SyncMode::Discovery,
            ModeArg::Refresh => SyncMode::Refresh,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("pricecat-cli: nothing to do, see --help");
        return Ok(());
    };

    let config = pricecat_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = pricecat_db::PoolConfig::from_app_config(&config);
    let pool = pricecat_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        Commands::Sync {
            mode,
            category,
            limit,
        } => sync::run_sync(&pool, &config, mode.into(), category.as_deref(), limit).await?,
        Commands::Budget => report::run_budget(&pool, &config).await?,
        Commands::Migrate => {
            let applied = pricecat_db::run_migrations(&pool).await?;
            println!("migrations applied: {applied}");
        }
        Commands::Listings(args) => report::run_listings(&pool, &args).await?,
        Commands::Runs { limit } => report::run_runs(&pool, limit).await?,
    }

    Ok(())
}
