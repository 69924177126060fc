//! Routes for the game bounded context.

use axum::extract::{Path, State};
use axum::{
    Json, Router,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use davalot_core::event::DomainEvent;
use davalot_core::notifier::PlayerAddress;
use davalot_game::application::command_handlers::{self, ActionOutcome, GameCommandResult};
use davalot_game::application::query_handlers::{self, GameView};
use davalot_game::domain::commands::{self, GameAction};

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /{channel_id}/lobby.
#[derive(Debug, Deserialize)]
pub struct OpenLobbyRequest {
    /// The player opening the lobby.
    pub host: PlayerAddress,
    /// Replace an unfinished game.
    #[serde(default)]
    pub force: bool,
}

/// Request body for POST /{channel_id}/actions.
#[derive(Debug, Deserialize)]
pub struct ActionRequest {
    /// Who is acting.
    pub actor: PlayerAddress,
    /// The action, tagged by `type`.
    pub action: GameAction,
}

/// A persisted domain event.
#[derive(Debug, Serialize)]
pub struct EventSummary {
    pub event_id: Uuid,
    pub event_type: String,
    pub payload: serde_json::Value,
}

/// Response body returned after a command is handled.
#[derive(Debug, Serialize)]
pub struct CommandResponse {
    /// The game instance the command ran against.
    pub session_id: Uuid,
    /// Stored version after the command.
    pub version: i64,
    /// `applied` or `ignored`.
    pub outcome: &'static str,
    /// Why an ignored action changed nothing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Events produced and persisted.
    pub events: Vec<EventSummary>,
    /// The session as rendered after the command.
    pub view: GameView,
}

impl From<GameCommandResult> for CommandResponse {
    fn from(result: GameCommandResult) -> Self {
        let view = query_handlers::render(&result.session);
        let (outcome, reason, events) = match result.outcome {
            ActionOutcome::Applied(events) => {
                let events = events
                    .iter()
                    .map(|e| EventSummary {
                        event_id: e.metadata().event_id,
                        event_type: e.event_type().to_owned(),
                        payload: e.to_payload(),
                    })
                    .collect();
                ("applied", None, events)
            }
            ActionOutcome::Ignored(reason) => ("ignored", Some(reason), Vec::new()),
        };
        Self {
            session_id: result.session_id,
            version: result.version,
            outcome,
            reason,
            events,
            view,
        }
    }
}

/// POST /{channel_id}/lobby
#[instrument(skip(state, request), fields(host = %request.host.username))]
async fn open_lobby(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
    Json(request): Json<OpenLobbyRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    let command = commands::OpenLobby {
        correlation_id: Uuid::new_v4(),
        channel_id,
        host: request.host,
        force: request.force,
    };

    info!(correlation_id = %command.correlation_id, "handling open_lobby command");

    let result = command_handlers::handle_open_lobby(
        &command,
        state.settings.debug,
        state.clock.as_ref(),
        &*state.session_repository,
        &*state.notifier,
    )
    .await?;

    Ok(Json(result.into()))
}

/// POST /{channel_id}/actions
#[instrument(
    skip(state, request),
    fields(actor = %request.actor.username, action = request.action.name())
)]
async fn perform_action(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
    Json(request): Json<ActionRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    let command = commands::PerformAction {
        correlation_id: Uuid::new_v4(),
        channel_id,
        actor: request.actor,
        action: request.action,
    };

    info!(correlation_id = %command.correlation_id, "handling perform_action command");

    let result = command_handlers::handle_perform_action(
        &command,
        state.settings.max_conflict_retries,
        state.clock.as_ref(),
        &state.rng,
        &*state.session_repository,
        &*state.notifier,
    )
    .await?;

    Ok(Json(result.into()))
}

/// GET /{channel_id}
#[instrument(skip(state))]
async fn get_game(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
) -> Result<Json<GameView>, ApiError> {
    let view = query_handlers::get_game_view(&channel_id, &*state.session_repository).await?;
    Ok(Json(view))
}

/// Returns the router for the game context.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{channel_id}", get(get_game))
        .route("/{channel_id}/lobby", post(open_lobby))
        .route("/{channel_id}/actions", post(perform_action))
}
