//! Chronicle API server entry point.

use std::sync::Arc;

use chronicle_api::config::AppConfig;
use chronicle_api::error::AppError;
use chronicle_api::state::AppState;
use chronicle_core::handle::RepositoryHandle;
use chronicle_core::memory::InMemoryStorage;
use chronicle_core::storage::StorageStrategy;
use chronicle_store::pg_storage::PgStorage;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

/// Selects the storage strategy from configuration.
async fn storage_from(config: &AppConfig) -> Result<Arc<dyn StorageStrategy>, AppError> {
    let Some(database_url) = config.database_url.as_deref() else {
        tracing::warn!("DATABASE_URL not set, events are kept in memory only");
        return Ok(Arc::new(InMemoryStorage::new()));
    };

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(database_url)
        .await?;
    let storage = PgStorage::new(pool);
    storage.ensure_schema().await?;
    tracing::info!("using PostgreSQL storage");

    Ok(Arc::new(storage))
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Chronicle API server");

    let config = AppConfig::from_env()?;
    let storage = storage_from(&config).await?;

    // One repository per process, shared by every handler through the handle.
    let app_state = AppState::new(RepositoryHandle::new(storage));

    // TODO: Replace CorsLayer::permissive() with restricted origins for production.
    let app = chronicle_api::build_router(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = config.bind_addr()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
