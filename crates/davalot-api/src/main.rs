//! Davalot API server entry point.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use davalot_api::config::Config;
use davalot_api::error::AppError;
use davalot_api::notifier::TracingNotifier;
use davalot_api::state::{AppState, GameSettings};
use davalot_core::clock::{Clock, SystemClock};
use davalot_core::repository::SessionRepository;
use davalot_core::rng::{DeterministicRng, StdGameRng};
use davalot_session_store::memory_session_repository::InMemorySessionRepository;
use davalot_session_store::pg_session_repository::PgSessionRepository;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Davalot API server");

    let config = Config::from_env()?;

    let (session_repository, session_store): (Arc<dyn SessionRepository>, &'static str) =
        match &config.database_url {
            Some(database_url) => {
                let pool = PgPoolOptions::new()
                    .max_connections(10)
                    .connect(database_url)
                    .await?;
                sqlx::migrate!("../../migrations").run(&pool).await?;
                (
                    Arc::new(PgSessionRepository::new(pool)) as Arc<dyn SessionRepository>,
                    "postgres",
                )
            }
            None => {
                tracing::warn!("DATABASE_URL not set, game sessions will not survive a restart");
                (
                    Arc::new(InMemorySessionRepository::new()) as Arc<dyn SessionRepository>,
                    "memory",
                )
            }
        };

    if config.debug {
        tracing::warn!("debug mode enabled: new lobbies skip turn checks and fill empty seats");
    }

    let clock: Arc<dyn Clock + Send + Sync> = Arc::new(SystemClock);
    let rng: Arc<Mutex<dyn DeterministicRng + Send>> =
        Arc::new(Mutex::new(StdGameRng::from_entropy()));
    let settings = GameSettings {
        debug: config.debug,
        max_conflict_retries: config.max_conflict_retries,
        session_store,
    };
    let app_state = AppState::new(
        clock,
        rng,
        session_repository,
        Arc::new(TracingNotifier),
        settings,
    );

    // TODO: Replace CorsLayer::permissive() with restricted origins for production.
    let app = davalot_api::app(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
