//! Command handlers for the game context.
//!
//! This module contains application-level command handler functions that
//! orchestrate domain logic: load the channel's session, apply the action,
//! save the new snapshot, then notify players.

use std::sync::Mutex;

use davalot_core::aggregate::AggregateRoot;
use davalot_core::clock::Clock;
use davalot_core::error::DomainError;
use davalot_core::notifier::{Notifier, PlayerAddress};
use davalot_core::repository::{SessionRepository, StoredSession};
use davalot_core::rng::DeterministicRng;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::domain::aggregates::GameSession;
use crate::domain::commands::{GameAction, OpenLobby, PerformAction};
use crate::domain::events::{GameEvent, GameEventKind};
use crate::domain::reveal::role_reveal_messages;

/// Save attempts retried after a concurrency conflict before giving up.
pub const DEFAULT_MAX_CONFLICT_RETRIES: u32 = 3;

/// Posted to the channel once a new lobby is stored.
pub const LOBBY_OPENED_ANNOUNCEMENT: &str = "Davalot lobby is open!";

/// What an accepted action did to the session.
#[derive(Debug, Clone)]
pub enum ActionOutcome {
    /// The action changed the session; these events were persisted.
    Applied(Vec<GameEvent>),
    /// The action was legal but changed nothing. Nothing was saved.
    Ignored(String),
}

/// Result of a handled game command.
#[derive(Debug, Clone)]
pub struct GameCommandResult {
    /// The game instance the command ran against.
    pub session_id: Uuid,
    /// Version of the stored session after the command.
    pub version: i64,
    pub outcome: ActionOutcome,
    /// The session as stored after the command.
    pub session: GameSession,
}

pub(crate) fn to_stored_session(
    session: &GameSession,
    clock: &dyn Clock,
) -> Result<StoredSession, DomainError> {
    let payload = serde_json::to_value(session)
        .map_err(|e| DomainError::Infrastructure(format!("session serialization failed: {e}")))?;
    Ok(StoredSession {
        channel_id: session.channel_id.clone(),
        session_id: session.id,
        version: session.version(),
        payload,
        saved_at: clock.now(),
    })
}

/// Restores a `GameSession` from its stored snapshot.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the payload does not deserialize.
pub(crate) fn from_stored_session(stored: &StoredSession) -> Result<GameSession, DomainError> {
    serde_json::from_value(stored.payload.clone())
        .map_err(|e| DomainError::Infrastructure(format!("session deserialization failed: {e}")))
}

/// Applies one action to a session without touching the input.
///
/// Returns the next session with its events already committed to its state,
/// or the error with the input left as it was.
///
/// # Errors
///
/// Returns the `DomainError` produced by the action's validation.
pub fn apply(
    session: &GameSession,
    actor: &PlayerAddress,
    action: &GameAction,
    correlation_id: Uuid,
    clock: &dyn Clock,
    rng: &mut dyn DeterministicRng,
) -> Result<(GameSession, Vec<GameEvent>), DomainError> {
    let mut next = session.clone();
    next.clear_uncommitted_events();
    next.handle(actor, action, correlation_id, clock, rng)?;
    let events = next.uncommitted_events().to_vec();
    next.clear_uncommitted_events();
    Ok((next, events))
}

/// Handles the `OpenLobby` command: creates a new session for the channel
/// with the host seated, replacing a finished game.
///
/// An unfinished game blocks the channel unless `force` is set. The channel
/// is told about the lobby once it is stored.
///
/// # Errors
///
/// Returns `DomainError::GameInProgress` if an unfinished game exists and
/// the command does not force a replacement, or `DomainError` if loading or
/// saving fails.
#[instrument(skip_all, fields(channel_id = %command.channel_id, force = command.force))]
pub async fn handle_open_lobby(
    command: &OpenLobby,
    debug: bool,
    clock: &dyn Clock,
    repo: &dyn SessionRepository,
    notifier: &dyn Notifier,
) -> Result<GameCommandResult, DomainError> {
    let existing = repo.load_session(&command.channel_id).await?;

    let expected_version = match &existing {
        Some(stored) => {
            let current = from_stored_session(stored)?;
            if !current.stage().is_terminal() && !command.force {
                return Err(DomainError::GameInProgress(command.channel_id.clone()));
            }
            stored.version
        }
        None => 0,
    };

    let mut session = GameSession::new(Uuid::new_v4(), &command.channel_id, expected_version);
    session.open_lobby(&command.host, debug, command.correlation_id, clock);
    let events = session.uncommitted_events().to_vec();
    session.clear_uncommitted_events();

    let stored = to_stored_session(&session, clock)?;
    repo.save_session(&command.channel_id, expected_version, &stored)
        .await?;

    info!(
        channel_id = %command.channel_id,
        session_id = %session.id,
        replaced = existing.is_some(),
        "lobby opened"
    );

    announce(notifier, &command.channel_id, LOBBY_OPENED_ANNOUNCEMENT).await;

    Ok(GameCommandResult {
        session_id: session.id,
        version: session.version(),
        outcome: ActionOutcome::Applied(events),
        session,
    })
}

/// Handles the `PerformAction` command: loads the channel's session, applies
/// the action, and saves the result with a compare-and-swap.
///
/// A conflicting save reloads and re-applies the action, up to
/// `max_conflict_retries` times. Notifications are only sent once the new
/// session is stored. A channel without a game is told so.
///
/// The `Mutex` is locked only around the synchronous domain call to avoid
/// holding a `MutexGuard` across await points.
///
/// # Errors
///
/// Returns `DomainError::SessionNotFound` if the channel has no session, the
/// action's `DomainError` if it is rejected, or
/// `DomainError::ConcurrencyConflict` once retries are exhausted.
#[instrument(
    skip_all,
    fields(channel_id = %command.channel_id, action = command.action.name())
)]
pub async fn handle_perform_action(
    command: &PerformAction,
    max_conflict_retries: u32,
    clock: &dyn Clock,
    rng: &Mutex<dyn DeterministicRng + Send>,
    repo: &dyn SessionRepository,
    notifier: &dyn Notifier,
) -> Result<GameCommandResult, DomainError> {
    let mut attempt = 0;
    loop {
        let Some(stored) = repo.load_session(&command.channel_id).await? else {
            let err = DomainError::SessionNotFound(command.channel_id.clone());
            warn!(
                channel_id = %command.channel_id,
                action = command.action.name(),
                "no game session for action"
            );
            announce(notifier, &command.channel_id, &err.to_string()).await;
            return Err(err);
        };
        let session = from_stored_session(&stored)?;

        let applied = {
            let mut rng_guard = rng
                .lock()
                .map_err(|e| DomainError::Infrastructure(format!("RNG mutex poisoned: {e}")))?;
            apply(
                &session,
                &command.actor,
                &command.action,
                command.correlation_id,
                clock,
                &mut *rng_guard,
            )
        };

        let (next, events) = match applied {
            Ok(result) => result,
            Err(DomainError::NoOpIgnored(reason)) => {
                debug!(
                    channel_id = %command.channel_id,
                    action = command.action.name(),
                    %reason,
                    "action ignored"
                );
                return Ok(GameCommandResult {
                    session_id: session.id,
                    version: stored.version,
                    outcome: ActionOutcome::Ignored(reason),
                    session,
                });
            }
            Err(err) => {
                warn!(
                    channel_id = %command.channel_id,
                    action = command.action.name(),
                    actor = %command.actor.username,
                    error = %err,
                    "action rejected"
                );
                if err.is_channel_visible() {
                    announce(notifier, &command.channel_id, &err.to_string()).await;
                }
                return Err(err);
            }
        };

        let snapshot = to_stored_session(&next, clock)?;
        match repo
            .save_session(&command.channel_id, stored.version, &snapshot)
            .await
        {
            Ok(()) => {}
            Err(DomainError::ConcurrencyConflict { .. }) if attempt < max_conflict_retries => {
                attempt += 1;
                warn!(
                    channel_id = %command.channel_id,
                    action = command.action.name(),
                    attempt,
                    "session changed underneath action, retrying"
                );
                continue;
            }
            Err(err) => return Err(err),
        }

        info!(
            channel_id = %command.channel_id,
            action = command.action.name(),
            version = next.version(),
            stage = %next.stage(),
            events = events.len(),
            "action applied"
        );

        deliver_notifications(&next, &events, notifier).await;

        return Ok(GameCommandResult {
            session_id: next.id,
            version: next.version(),
            outcome: ActionOutcome::Applied(events),
            session: next,
        });
    }
}

/// Sends the side-effect messages for persisted events.
///
/// Delivery failures are logged; the action has already been stored.
async fn deliver_notifications(session: &GameSession, events: &[GameEvent], notifier: &dyn Notifier) {
    let dealt = events
        .iter()
        .any(|e| matches!(e.kind, GameEventKind::RolesDealt(_)));
    if !dealt {
        return;
    }
    for (address, message) in role_reveal_messages(session) {
        if let Err(err) = notifier.notify_player(&address, &message).await {
            warn!(username = %address.username, error = %err, "role reveal not delivered");
        }
    }
}

async fn announce(notifier: &dyn Notifier, channel_id: &str, text: &str) {
    if let Err(err) = notifier.notify_channel(channel_id, text).await {
        warn!(%channel_id, error = %err, "channel message not delivered");
    }
}
