use std::sync::Arc;

use anyhow::Context;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use bookingdesk::clock::SystemClock;
use bookingdesk::config::AppConfig;
use bookingdesk::db::SqliteSnapshots;
use bookingdesk::handlers;
use bookingdesk::services::catalog::Catalog;
use bookingdesk::services::store::BookingStore;
use bookingdesk::state::AppState;

fn load_catalog(config: &AppConfig) -> anyhow::Result<Catalog> {
    match &config.catalog_path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read catalog file: {path}"))?;
            let catalog = Catalog::from_json(&raw)
                .with_context(|| format!("invalid catalog file: {path}"))?;
            tracing::info!("loaded catalog from {path}");
            Ok(catalog)
        }
        None => {
            tracing::info!("CATALOG_PATH not set, using demo catalog");
            Ok(Catalog::demo())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();
    if config.admin_token == "changeme" {
        tracing::warn!("ADMIN_TOKEN not set, using the default token");
    }

    let catalog = Arc::new(load_catalog(&config)?);
    let snapshots = SqliteSnapshots::open(&config.database_url)?;
    let store = BookingStore::with_snapshots(catalog, Arc::new(SystemClock), Box::new(snapshots))?;

    let state = Arc::new(AppState::new(Arc::new(store), config.clone()));

    let app = handlers::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
