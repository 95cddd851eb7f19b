//! Chronicle API — HTTP surface over the event repository.

use axum::Router;

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

/// Builds the application router with every route mounted.
pub fn build_router(app_state: state::AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", routes::events::router())
        .with_state(app_state)
}
