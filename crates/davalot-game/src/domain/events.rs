//! Domain events for the game context.

use davalot_core::event::{DomainEvent, EventMetadata};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::characters::{Character, Team};
use super::player::Player;
use super::quest_rules::QuestTally;

/// Emitted when a lobby is opened in a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LobbyOpened {
    /// The new game instance.
    pub session_id: Uuid,
    /// The channel hosting the game.
    pub channel_id: String,
    /// Username of the player who opened the lobby.
    pub host_username: String,
    /// User identifier of the host.
    pub host_user_id: String,
    /// Whether development overrides are enabled.
    pub debug: bool,
}

/// Emitted when a player joins (or re-joins) the lobby.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerJoined {
    pub username: String,
    pub user_id: String,
}

/// Emitted when a player leaves the lobby.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerLeft {
    pub username: String,
}

/// Emitted when optional characters are added to or removed from the game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterToggled {
    /// The characters affected (linked characters move together).
    pub characters: Vec<Character>,
    /// `true` if they were added.
    pub selected: bool,
}

/// Emitted when a debug session starts impersonating a player.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActingAsSet {
    pub username: String,
}

/// Emitted when roles are dealt and the first proposal begins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolesDealt {
    /// Players in turn order, each with a role.
    pub players: Vec<Player>,
}

/// Emitted when the proposer adds or removes a crew member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrewMemberToggled {
    pub username: String,
    /// `true` if the player was added to the crew.
    pub added: bool,
}

/// Emitted when a full crew is put to the vote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestSubmitted {
    pub crew: Vec<String>,
}

/// Emitted when a player votes on the proposed crew.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteCast {
    pub username: String,
    pub approve: bool,
}

/// Emitted when the vote on a proposal passes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalApproved {
    pub votes_for: usize,
    pub votes_against: usize,
    /// Human-readable breakdown of the votes.
    pub summary: String,
}

/// Emitted when the vote on a proposal fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalRejected {
    pub votes_for: usize,
    pub votes_against: usize,
    /// Human-readable breakdown of the votes.
    pub summary: String,
}

/// Emitted when the right to propose passes to the next player.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnPassed {
    pub turn_index: usize,
}

/// Emitted when a crew member plays a quest card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestContributed {
    pub round: usize,
    pub username: String,
    /// The effective card; good players always contribute a success.
    pub success: bool,
}

/// Emitted when every crew member has contributed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestResolved {
    pub round: usize,
    pub tally: QuestTally,
}

/// Emitted when play moves on to the next quest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundAdvanced {
    pub round: usize,
    pub turn_index: usize,
    pub hammer_index: usize,
}

/// Emitted when good has won three quests and the Assassin gets a final shot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssassinationStarted {
    pub quests_succeeded: usize,
}

/// Emitted when the Assassin picks (or changes) a target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssassinationTargetSet {
    pub username: String,
}

/// Why a game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameEndReason {
    /// The hammer proposal was rejected.
    ProposalsExhausted,
    /// Three quests failed.
    QuestsFailed,
    /// The Assassin found Merlin.
    MerlinAssassinated,
    /// The Assassin picked someone other than Merlin.
    AssassinMissed,
}

/// Emitted when the game reaches a terminal stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameEnded {
    pub winner: Team,
    pub reason: GameEndReason,
}

/// Event type identifier for [`LobbyOpened`].
pub const LOBBY_OPENED_EVENT_TYPE: &str = "game.lobby_opened";
/// Event type identifier for [`PlayerJoined`].
pub const PLAYER_JOINED_EVENT_TYPE: &str = "game.player_joined";
/// Event type identifier for [`PlayerLeft`].
pub const PLAYER_LEFT_EVENT_TYPE: &str = "game.player_left";
/// Event type identifier for [`CharacterToggled`].
pub const CHARACTER_TOGGLED_EVENT_TYPE: &str = "game.character_toggled";
/// Event type identifier for [`ActingAsSet`].
pub const ACTING_AS_SET_EVENT_TYPE: &str = "game.acting_as_set";
/// Event type identifier for [`RolesDealt`].
pub const ROLES_DEALT_EVENT_TYPE: &str = "game.roles_dealt";
/// Event type identifier for [`CrewMemberToggled`].
pub const CREW_MEMBER_TOGGLED_EVENT_TYPE: &str = "game.crew_member_toggled";
/// Event type identifier for [`QuestSubmitted`].
pub const QUEST_SUBMITTED_EVENT_TYPE: &str = "game.quest_submitted";
/// Event type identifier for [`VoteCast`].
pub const VOTE_CAST_EVENT_TYPE: &str = "game.vote_cast";
/// Event type identifier for [`ProposalApproved`].
pub const PROPOSAL_APPROVED_EVENT_TYPE: &str = "game.proposal_approved";
/// Event type identifier for [`ProposalRejected`].
pub const PROPOSAL_REJECTED_EVENT_TYPE: &str = "game.proposal_rejected";
/// Event type identifier for [`TurnPassed`].
pub const TURN_PASSED_EVENT_TYPE: &str = "game.turn_passed";
/// Event type identifier for [`QuestContributed`].
pub const QUEST_CONTRIBUTED_EVENT_TYPE: &str = "game.quest_contributed";
/// Event type identifier for [`QuestResolved`].
pub const QUEST_RESOLVED_EVENT_TYPE: &str = "game.quest_resolved";
/// Event type identifier for [`RoundAdvanced`].
pub const ROUND_ADVANCED_EVENT_TYPE: &str = "game.round_advanced";
/// Event type identifier for [`AssassinationStarted`].
pub const ASSASSINATION_STARTED_EVENT_TYPE: &str = "game.assassination_started";
/// Event type identifier for [`AssassinationTargetSet`].
pub const ASSASSINATION_TARGET_SET_EVENT_TYPE: &str = "game.assassination_target_set";
/// Event type identifier for [`GameEnded`].
pub const GAME_ENDED_EVENT_TYPE: &str = "game.game_ended";

/// Event payload variants for the game context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GameEventKind {
    LobbyOpened(LobbyOpened),
    PlayerJoined(PlayerJoined),
    PlayerLeft(PlayerLeft),
    CharacterToggled(CharacterToggled),
    ActingAsSet(ActingAsSet),
    RolesDealt(RolesDealt),
    CrewMemberToggled(CrewMemberToggled),
    QuestSubmitted(QuestSubmitted),
    VoteCast(VoteCast),
    ProposalApproved(ProposalApproved),
    ProposalRejected(ProposalRejected),
    TurnPassed(TurnPassed),
    QuestContributed(QuestContributed),
    QuestResolved(QuestResolved),
    RoundAdvanced(RoundAdvanced),
    AssassinationStarted(AssassinationStarted),
    AssassinationTargetSet(AssassinationTargetSet),
    GameEnded(GameEnded),
}

impl GameEventKind {
    /// Returns the event type name for this payload.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::LobbyOpened(_) => LOBBY_OPENED_EVENT_TYPE,
            Self::PlayerJoined(_) => PLAYER_JOINED_EVENT_TYPE,
            Self::PlayerLeft(_) => PLAYER_LEFT_EVENT_TYPE,
            Self::CharacterToggled(_) => CHARACTER_TOGGLED_EVENT_TYPE,
            Self::ActingAsSet(_) => ACTING_AS_SET_EVENT_TYPE,
            Self::RolesDealt(_) => ROLES_DEALT_EVENT_TYPE,
            Self::CrewMemberToggled(_) => CREW_MEMBER_TOGGLED_EVENT_TYPE,
            Self::QuestSubmitted(_) => QUEST_SUBMITTED_EVENT_TYPE,
            Self::VoteCast(_) => VOTE_CAST_EVENT_TYPE,
            Self::ProposalApproved(_) => PROPOSAL_APPROVED_EVENT_TYPE,
            Self::ProposalRejected(_) => PROPOSAL_REJECTED_EVENT_TYPE,
            Self::TurnPassed(_) => TURN_PASSED_EVENT_TYPE,
            Self::QuestContributed(_) => QUEST_CONTRIBUTED_EVENT_TYPE,
            Self::QuestResolved(_) => QUEST_RESOLVED_EVENT_TYPE,
            Self::RoundAdvanced(_) => ROUND_ADVANCED_EVENT_TYPE,
            Self::AssassinationStarted(_) => ASSASSINATION_STARTED_EVENT_TYPE,
            Self::AssassinationTargetSet(_) => ASSASSINATION_TARGET_SET_EVENT_TYPE,
            Self::GameEnded(_) => GAME_ENDED_EVENT_TYPE,
        }
    }
}

/// Domain event envelope for the game context.
#[derive(Debug, Clone)]
pub struct GameEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: GameEventKind,
}

impl DomainEvent for GameEvent {
    fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }

    fn to_payload(&self) -> serde_json::Value {
        // Serialization of derived Serialize types to Value is infallible.
        serde_json::to_value(&self.kind).expect("GameEventKind serialization is infallible")
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}
