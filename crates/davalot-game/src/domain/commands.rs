//! Commands for the game context.

use davalot_core::command::Command;
use davalot_core::notifier::PlayerAddress;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::characters::Character;

/// An inbound player action against a channel's session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameAction {
    /// Join the lobby (re-joining replaces the existing entry).
    JoinLobby,
    /// Leave the lobby.
    LeaveLobby,
    /// Add or remove an optional character.
    ToggleCharacter { character: Character },
    /// Deal roles and begin the first proposal.
    StartGame,
    /// Debug sessions only: act as another player from now on.
    ActAs { username: String },
    /// Add or remove a player from the proposed crew.
    Nominate { target: String },
    /// Put the proposed crew to the vote.
    SubmitQuest,
    /// Approve or reject the proposed crew.
    Vote { approve: bool },
    /// Play a success or fail card on the quest.
    CompleteQuest { succeed: bool },
    /// Choose who the Assassin will strike.
    SetAssassinationTarget { target: String },
    /// Strike the chosen target.
    Assassinate,
}

impl GameAction {
    /// Stable action name, used in errors and logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::JoinLobby => "join_lobby",
            Self::LeaveLobby => "leave_lobby",
            Self::ToggleCharacter { .. } => "toggle_character",
            Self::StartGame => "start_game",
            Self::ActAs { .. } => "act_as",
            Self::Nominate { .. } => "nominate",
            Self::SubmitQuest => "submit_quest",
            Self::Vote { .. } => "vote",
            Self::CompleteQuest { .. } => "complete_quest",
            Self::SetAssassinationTarget { .. } => "set_assassination_target",
            Self::Assassinate => "assassinate",
        }
    }

    /// Whether the debug impersonation target replaces the real actor.
    ///
    /// Lobby membership always uses the caller's own identity.
    #[must_use]
    pub fn honours_acting_as(&self) -> bool {
        !matches!(self, Self::JoinLobby | Self::LeaveLobby | Self::ActAs { .. })
    }
}

/// Command to open a new lobby in a channel.
#[derive(Debug, Clone)]
pub struct OpenLobby {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The channel to host the game.
    pub channel_id: String,
    /// The player opening the lobby; joins as the first player.
    pub host: PlayerAddress,
    /// Replace an unfinished game if one exists.
    pub force: bool,
}

impl Command for OpenLobby {
    fn command_type(&self) -> &'static str {
        "game.open_lobby"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to apply a player action to a channel's session.
#[derive(Debug, Clone)]
pub struct PerformAction {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The channel whose session is targeted.
    pub channel_id: String,
    /// Who is acting.
    pub actor: PlayerAddress,
    /// What they are doing.
    pub action: GameAction,
}

impl Command for PerformAction {
    fn command_type(&self) -> &'static str {
        "game.perform_action"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}
