use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use marketplace_api::config::AppConfig;
use marketplace_api::database::{DatabaseManager, MemoryListingStore, PgListingStore};
use marketplace_api::identity::{AdminList, IdentityResolver, JwtIdentityProvider};
use marketplace_api::listing::ports::{ImageStore, ListingStore};
use marketplace_api::listing::{ListingRules, ListingService};
use marketplace_api::middleware::RateLimiter;
use marketplace_api::storage::{HttpImageStore, MemoryImageStore};
use marketplace_api::{router, AppState};

#[derive(Debug, Parser)]
#[command(name = "marketplace-api", version, about = "Listing marketplace API server")]
struct Args {
    /// Bind host, overrides MARKETPLACE_API_HOST
    #[arg(long)]
    host: Option<String>,

    /// Bind port, overrides MARKETPLACE_API_PORT / PORT
    #[arg(long, short)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("marketplace_api=info,tower_http=info")),
        )
        .init();

    let args = Args::parse();
    let mut config = AppConfig::from_env();
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    tracing::info!("Starting Marketplace API in {:?} mode", config.environment);

    let (store, database) = listing_store(&config).await?;
    let images = image_store(&config)?;

    let admins = AdminList::new(&config.security.admin_emails);
    if admins.is_empty() {
        tracing::warn!("ADMIN_EMAILS is empty, no account can moderate listings");
    }
    let identity = IdentityResolver::new(Arc::new(JwtIdentityProvider::from_config(&config.security)), admins);

    let rules = ListingRules::from_config(&config).context("STORAGE_URL is not a valid URL")?;
    tracing::info!("Trusting listing images from {}", rules.trusted_storage.host());

    let listings = Arc::new(ListingService::new(identity, store, images, rules));
    let limiter = RateLimiter::in_memory(config.rate_limit.clone())
        .context("invalid rate limit configuration")?;
    if limiter.enabled() {
        spawn_rate_limit_pruning(limiter.clone());
    }

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(Arc::new(config), listings);
    let app = router(state, limiter);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Marketplace API listening on http://{}", bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Some(database) = database {
        database.close().await;
    }
    tracing::info!("Marketplace API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Idle client budgets are dropped once per window.
fn spawn_rate_limit_pruning(limiter: RateLimiter) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(limiter.window());
        loop {
            ticker.tick().await;
            limiter.prune().await;
        }
    });
}

/// The manager is returned so its pool can be closed on shutdown.
async fn listing_store(
    config: &AppConfig,
) -> anyhow::Result<(Arc<dyn ListingStore>, Option<DatabaseManager>)> {
    if config.database.url.is_none() {
        tracing::warn!("DATABASE_URL not set, listings are kept in memory and lost on restart");
        return Ok((Arc::new(MemoryListingStore::new()), None));
    }

    let manager = DatabaseManager::connect(&config.database)
        .await
        .context("failed to connect to the listing database")?;
    let store = PgListingStore::new(&manager);
    if config.database.run_migrations {
        store.ensure_schema().await.context("failed to prepare listing schema")?;
    }
    Ok((Arc::new(store), Some(manager)))
}

fn image_store(config: &AppConfig) -> anyhow::Result<Arc<dyn ImageStore>> {
    match HttpImageStore::from_config(&config.storage)? {
        Some(store) => Ok(Arc::new(store)),
        None => {
            tracing::warn!("STORAGE_SERVICE_KEY not set, uploaded images are kept in memory");
            Ok(Arc::new(MemoryImageStore::new(&config.storage.url, &config.storage.bucket)))
        }
    }
}
