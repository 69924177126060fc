//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use davalot_core::clock::Clock;
use davalot_core::rng::DeterministicRng;
use davalot_session_store::memory_session_repository::InMemorySessionRepository;
use davalot_test_support::{FixedClock, MockRng, RecordingNotifier};
use http_body_util::BodyExt;
use tower::ServiceExt;

use davalot_api::state::{AppState, GameSettings};

/// Fixed timestamp used across all integration tests.
fn fixed_clock() -> Arc<dyn Clock + Send + Sync> {
    Arc::new(FixedClock(
        chrono::TimeZone::with_ymd_and_hms(&chrono::Utc, 2026, 1, 15, 10, 0, 0).unwrap(),
    ))
}

/// The app router plus the notifier it delivers to.
pub struct TestApp {
    pub router: Router,
    pub notifier: Arc<RecordingNotifier>,
}

impl TestApp {
    /// A router sharing this app's state, for one request.
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

/// Build the full app with an in-memory session store and deterministic
/// Clock/RNG. Uses the same route structure as `main.rs`.
pub fn build_test_app() -> TestApp {
    build_test_app_with(GameSettings {
        max_conflict_retries: 16,
        ..GameSettings::default()
    })
}

/// Build the full app with lobbies opened as debug sessions.
pub fn build_debug_test_app() -> TestApp {
    build_test_app_with(GameSettings {
        debug: true,
        ..GameSettings::default()
    })
}

fn build_test_app_with(settings: GameSettings) -> TestApp {
    let rng: Arc<Mutex<dyn DeterministicRng + Send>> = Arc::new(Mutex::new(MockRng));
    let notifier = Arc::new(RecordingNotifier::new());
    let app_state = AppState::new(
        fixed_clock(),
        rng,
        Arc::new(InMemorySessionRepository::new()),
        notifier.clone(),
        settings,
    );

    TestApp {
        router: davalot_api::app(app_state),
        notifier,
    }
}

/// The `{ username, user_id }` object for a player.
pub fn player(username: &str) -> serde_json::Value {
    serde_json::json!({ "username": username, "user_id": format!("U-{username}") })
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

/// POST an action for `actor` on channel `C1`.
pub async fn act(
    app: &TestApp,
    actor: &str,
    action: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    post_json(
        app.router(),
        "/api/v1/games/C1/actions",
        &serde_json::json!({ "actor": player(actor), "action": action }),
    )
    .await
}

/// Opens a lobby on `C1` hosted by `p0` and seats `p1..count`.
pub async fn seat_players(app: &TestApp, count: usize) {
    let (status, _) = post_json(
        app.router(),
        "/api/v1/games/C1/lobby",
        &serde_json::json!({ "host": player("p0") }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    for i in 1..count {
        let (status, _) = act(app, &format!("p{i}"), serde_json::json!({ "type": "join_lobby" })).await;
        assert_eq!(status, StatusCode::OK);
    }
}
