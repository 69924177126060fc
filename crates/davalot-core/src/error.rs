//! Domain error types.

use thiserror::Error;

/// Top-level domain error type.
///
/// Every variant is produced before any state mutation, so a returned error
/// always means the session was left exactly as it was loaded.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The action is not legal in the session's current stage.
    #[error("action `{action}` is not allowed during stage {stage}")]
    InvalidStageForAction {
        /// The attempted action.
        action: &'static str,
        /// The stage the session was in.
        stage: String,
    },

    /// The acting player is not entitled to act right now.
    #[error("it is not {username}'s turn")]
    NotPlayersTurn {
        /// The player who attempted to act.
        username: String,
    },

    /// Not enough players to start the game.
    #[error("not enough players: {required} required, {actual} joined")]
    InsufficientPlayers {
        /// Minimum number of players for the selected roles.
        required: usize,
        /// Players currently in the lobby.
        actual: usize,
    },

    /// Too many players to start the game.
    #[error("too many players: at most {maximum} allowed, {actual} joined")]
    TooManyPlayers {
        /// Maximum supported number of players.
        maximum: usize,
        /// Players currently in the lobby.
        actual: usize,
    },

    /// A referenced player is not part of the session.
    #[error("unknown player: {0}")]
    UnknownPlayer(String),

    /// The action was valid but produces no state change.
    #[error("ignored: {0}")]
    NoOpIgnored(String),

    /// No live session exists for the channel.
    #[error("no game session for channel {0}")]
    SessionNotFound(String),

    /// A live, unfinished game already occupies the channel.
    #[error("a game is already in progress in channel {0}")]
    GameInProgress(String),

    /// Optimistic concurrency conflict.
    #[error(
        "concurrency conflict on channel {channel_id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        /// The channel whose session had the conflict.
        channel_id: String,
        /// The expected version.
        expected: i64,
        /// The actual version found.
        actual: i64,
    },

    /// A validation error in domain logic or an inbound payload.
    #[error("validation error: {0}")]
    Validation(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl DomainError {
    /// Returns `true` for errors that should be announced to the channel
    /// rather than only returned to the acting player.
    #[must_use]
    pub fn is_channel_visible(&self) -> bool {
        matches!(
            self,
            Self::InsufficientPlayers { .. }
                | Self::TooManyPlayers { .. }
                | Self::SessionNotFound(_)
        )
    }
}
