//! Shared application state.

use std::sync::{Arc, Mutex};

use davalot_core::clock::Clock;
use davalot_core::notifier::Notifier;
use davalot_core::repository::SessionRepository;
use davalot_core::rng::DeterministicRng;
use davalot_game::application::command_handlers::DEFAULT_MAX_CONFLICT_RETRIES;

/// Runtime switches for game handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameSettings {
    /// Open new lobbies as debug sessions.
    pub debug: bool,
    /// Conflicting saves retried per action.
    pub max_conflict_retries: u32,
    /// Name of the configured session store, reported by `/health`.
    pub session_store: &'static str,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            debug: false,
            max_conflict_retries: DEFAULT_MAX_CONFLICT_RETRIES,
            session_store: "memory",
        }
    }
}

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Clock for timestamps.
    pub clock: Arc<dyn Clock + Send + Sync>,
    /// RNG for role dealing; locked only around synchronous domain calls.
    pub rng: Arc<Mutex<dyn DeterministicRng + Send>>,
    /// One session snapshot per channel.
    pub session_repository: Arc<dyn SessionRepository>,
    /// Outbound messages to players and channels.
    pub notifier: Arc<dyn Notifier>,
    pub settings: GameSettings,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock + Send + Sync>,
        rng: Arc<Mutex<dyn DeterministicRng + Send>>,
        session_repository: Arc<dyn SessionRepository>,
        notifier: Arc<dyn Notifier>,
        settings: GameSettings,
    ) -> Self {
        Self {
            clock,
            rng,
            session_repository,
            notifier,
            settings,
        }
    }
}
