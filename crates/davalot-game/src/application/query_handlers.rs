//! Query handlers for the game context.
//!
//! This module projects stored sessions into read-only view models for the
//! rendering layer.

use std::fmt;

use davalot_core::aggregate::AggregateRoot;
use davalot_core::error::DomainError;
use davalot_core::repository::SessionRepository;
use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

use crate::application::command_handlers::from_stored_session;
use crate::domain::aggregates::{GameSession, GameStage};
use crate::domain::composition::{RoleComposition, minimum_players_for, required_composition};
use crate::domain::quest_rules::{QuestOutcome, ROUND_COUNT, crew_size, resolve_quest};

/// One seat in the turn-order listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnOrderEntry {
    pub username: String,
    /// Whether this player is proposing the current crew.
    pub is_current: bool,
    /// Whether this player holds the last proposal of the round.
    pub is_hammer: bool,
}

/// Summary of one round's quest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QuestSummary {
    /// Not yet resolved; only the crew size is known.
    Pending { round: usize, crew_size: usize },
    /// Resolved, with its card counts.
    Resolved {
        round: usize,
        passed: bool,
        successes: usize,
        fails: usize,
    },
}

impl fmt::Display for QuestSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending { round, crew_size } => write!(f, "{}) {crew_size} questers", round + 1),
            Self::Resolved {
                round,
                passed,
                successes,
                fails,
            } => {
                let verdict = if *passed { "Passed" } else { "Failed" };
                write!(f, "{}) {verdict} ({successes}-{fails})", round + 1)
            }
        }
    }
}

/// What the lobby shows before the game starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LobbyView {
    /// Joined players, in join order.
    pub players: Vec<String>,
    /// Players needed for the selected characters.
    pub minimum_players: usize,
    /// "n player(s) ready, m required to start".
    pub readiness: String,
    /// Deck for `max(minimum_players, players)` seats.
    pub composition: RoleComposition,
}

/// Read-only view of a game session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameView {
    /// The game instance identifier.
    pub session_id: Uuid,
    /// The hosting channel.
    pub channel_id: String,
    /// Current stage as a string.
    pub stage: String,
    /// Instruction for whoever must act next.
    pub prompt: String,
    /// Players in turn order, empty in the lobby.
    pub turn_order: Vec<TurnOrderEntry>,
    /// One summary per round, empty in the lobby.
    pub quests: Vec<QuestSummary>,
    /// Crew currently proposed or on the quest.
    pub proposed_crew: Vec<String>,
    /// Describes the proposed crew while it is being chosen or voted on.
    pub crew_message: Option<String>,
    /// Outcome of the last vote or quest, or the deal notice.
    pub status_message: Option<String>,
    /// Lobby details, only while in the lobby.
    pub lobby: Option<LobbyView>,
    /// Player being impersonated, in debug sessions.
    pub acting_as: Option<String>,
    /// Current version (event count).
    pub version: i64,
}

/// Projects a session into its view model. Pure.
#[must_use]
pub fn render(session: &GameSession) -> GameView {
    let stage = session.stage();
    let in_game = stage != GameStage::Lobby;

    let turn_order = if in_game {
        session
            .players()
            .iter()
            .map(|p| TurnOrderEntry {
                username: p.username.clone(),
                is_current: p.turn_order == Some(session.turn_index()),
                is_hammer: p.turn_order == Some(session.hammer_index()),
            })
            .collect()
    } else {
        Vec::new()
    };

    let quests = if in_game {
        quest_summaries(session)
    } else {
        Vec::new()
    };

    let proposed_crew = session.proposed_quest().crew().to_vec();
    let crew_message = match stage {
        GameStage::ChooseQuest | GameStage::VoteOnQuest if !proposed_crew.is_empty() => {
            let verb = if proposed_crew.len() > 1 { "are" } else { "is" };
            let tentatively = if stage == GameStage::ChooseQuest {
                "tentatively "
            } else {
                ""
            };
            Some(format!(
                "{} {verb} {tentatively}proposed to go on the quest.",
                proposed_crew.join(", ")
            ))
        }
        _ => None,
    };

    GameView {
        session_id: session.id,
        channel_id: session.channel_id.clone(),
        stage: stage.to_string(),
        prompt: prompt(session),
        turn_order,
        quests,
        proposed_crew,
        crew_message,
        status_message: session.status_message().map(str::to_owned),
        lobby: (!in_game).then(|| lobby_view(session)),
        acting_as: session.acting_as().map(str::to_owned),
        version: session.version(),
    }
}

fn prompt(session: &GameSession) -> String {
    match session.stage() {
        GameStage::Lobby => "Game lobby is open!".to_owned(),
        GameStage::ChooseQuest => {
            let proposer = session
                .current_proposer()
                .map_or("Someone", |p| p.username.as_str());
            format!(
                "{proposer}, it is your turn to pick {} players to go on a quest.",
                session.required_crew_size()
            )
        }
        GameStage::VoteOnQuest => "Everyone, it is your turn to vote on the quest.".to_owned(),
        GameStage::CompleteQuest => format!(
            "{}, you have been sent on a quest.",
            session.proposed_quest().crew().join(", ")
        ),
        GameStage::Assassinate => "Assassin, choose who to assassinate!".to_owned(),
        GameStage::Won => "GAME OVER\nGood Triumphs!".to_owned(),
        GameStage::Lost => "GAME OVER\nEvil Triumphs!".to_owned(),
    }
}

/// A round is reported as resolved once every crew member has played a card.
fn quest_summaries(session: &GameSession) -> Vec<QuestSummary> {
    let player_count = session.players().len();
    (0..ROUND_COUNT)
        .map(|round| {
            let size = crew_size(player_count, round);
            match session.quest_record(round) {
                Some(record) if record.len() >= size => {
                    let tally = resolve_quest(record, round, player_count);
                    QuestSummary::Resolved {
                        round,
                        passed: tally.outcome == QuestOutcome::Success,
                        successes: tally.successes,
                        fails: tally.fails,
                    }
                }
                _ => QuestSummary::Pending {
                    round,
                    crew_size: size,
                },
            }
        })
        .collect()
}

fn lobby_view(session: &GameSession) -> LobbyView {
    let selected = session.selected_characters();
    let minimum_players = minimum_players_for(selected);
    let joined = session.players().len();
    LobbyView {
        players: session.players().iter().map(|p| p.username.clone()).collect(),
        minimum_players,
        readiness: format!("{joined} player(s) ready, {minimum_players} required to start"),
        composition: required_composition(minimum_players.max(joined), selected),
    }
}

/// Retrieves the rendered view of a channel's session.
///
/// # Errors
///
/// Returns `DomainError::SessionNotFound` if the channel has no session.
/// Returns `DomainError::Infrastructure` if the snapshot cannot be read.
#[instrument(skip(repo))]
pub async fn get_game_view(
    channel_id: &str,
    repo: &dyn SessionRepository,
) -> Result<GameView, DomainError> {
    let stored = repo
        .load_session(channel_id)
        .await?
        .ok_or_else(|| DomainError::SessionNotFound(channel_id.to_owned()))?;
    let session = from_stored_session(&stored)?;
    Ok(render(&session))
}
