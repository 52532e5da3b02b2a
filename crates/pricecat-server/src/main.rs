mod api;
mod middleware;
mod runs;
mod scheduler;

use std::sync::Arc;

use anyhow::Context;
use pricecat_core::Environment;
use pricecat_db::PgCatalog;
use pricecat_ingest::CatalogApiClient;
use pricecat_sync::{SyncOrchestrator, SyncSettings, TokenBudget};
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    middleware::AuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(pricecat_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = pricecat_db::PoolConfig::from_app_config(&config);
    let pool = pricecat_db::connect_pool(&config.database_url, pool_config).await?;
    pricecat_db::run_migrations(&pool).await?;

    let api_key = config
        .catalog_api_key
        .as_deref()
        .context("PRICECAT_CATALOG_API_KEY is required to run the server")?;
    let client = CatalogApiClient::new(
        api_key,
        &config.catalog_api_url,
        config.api_request_timeout_secs,
        config.api_max_retries,
        config.api_retry_backoff_base_ms,
    )?;
    let categories = pricecat_core::load_category_sources(&config.categories_path)?;

    let budget = Arc::new(TokenBudget::new(config.daily_token_budget));
    runs::seed_budget_from_history(&pool, &budget).await;

    let orchestrator = Arc::new(SyncOrchestrator::new(
        Arc::new(client),
        Arc::new(PgCatalog::new(pool.clone())),
        budget,
        Arc::new(categories),
        SyncSettings::from_app_config(&config),
    ));

    let _scheduler =
        scheduler::build_scheduler(Arc::clone(&orchestrator), Some(pool.clone()), &config).await?;

    let auth = AuthState::from_env(
        matches!(config.env, Environment::Development),
        config.api_key_hash_salt.as_deref(),
    )?;
    let app = build_app(
        AppState::new(orchestrator, Some(pool)),
        auth,
        default_rate_limit_state(),
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "pricecat-server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
