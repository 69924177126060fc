//! Davalot API: HTTP transport for the game engine.

use axum::Router;

pub mod config;
pub mod error;
pub mod notifier;
pub mod routes;
pub mod state;

use state::AppState;

/// Builds the application router with every route mounted.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1/games", routes::games::router())
        .with_state(state)
}
