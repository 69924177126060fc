//! Aggregate root for the game context.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use davalot_core::aggregate::AggregateRoot;
use davalot_core::clock::Clock;
use davalot_core::error::DomainError;
use davalot_core::event::EventMetadata;
use davalot_core::notifier::PlayerAddress;
use davalot_core::rng::DeterministicRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::characters::{Character, Team};
use super::commands::GameAction;
use super::composition::{MAX_PLAYERS, deal_roles, minimum_players_for};
use super::events::{
    ActingAsSet, AssassinationStarted, AssassinationTargetSet, CharacterToggled,
    CrewMemberToggled, GameEndReason, GameEnded, GameEvent, GameEventKind, LobbyOpened,
    PlayerJoined, PlayerLeft, ProposalApproved, ProposalRejected, QuestContributed,
    QuestResolved, QuestSubmitted, RolesDealt, RoundAdvanced, TurnPassed, VoteCast,
};
use super::player::Player;
use super::quest_rules::{QuestOutcome, QuestRecord, ROUND_COUNT, crew_size, resolve_quest};

/// Seats between the first proposer of a round and its hammer.
const HAMMER_OFFSET: usize = 4;

/// Quests a side must win.
const QUESTS_TO_WIN: usize = 3;

/// Lifecycle stage of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStage {
    Lobby,
    ChooseQuest,
    VoteOnQuest,
    CompleteQuest,
    Assassinate,
    Won,
    Lost,
}

impl GameStage {
    /// `Won` and `Lost` end the game.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }
}

impl fmt::Display for GameStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Lobby => "Lobby",
            Self::ChooseQuest => "ChooseQuest",
            Self::VoteOnQuest => "VoteOnQuest",
            Self::CompleteQuest => "CompleteQuest",
            Self::Assassinate => "Assassinate",
            Self::Won => "Won",
            Self::Lost => "Lost",
        };
        f.write_str(name)
    }
}

/// The crew being proposed this round and the votes cast on it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedQuest {
    crew: Vec<String>,
    votes: BTreeMap<String, bool>,
}

impl ProposedQuest {
    /// Crew members in nomination order.
    #[must_use]
    pub fn crew(&self) -> &[String] {
        &self.crew
    }

    /// Votes keyed by voter.
    #[must_use]
    pub fn votes(&self) -> &BTreeMap<String, bool> {
        &self.votes
    }

    #[must_use]
    pub fn contains(&self, username: &str) -> bool {
        self.crew.iter().any(|member| member == username)
    }

    fn tally(&self) -> (usize, usize) {
        let votes_for = self.votes.values().filter(|v| **v).count();
        (votes_for, self.votes.len() - votes_for)
    }

    fn summary(&self) -> String {
        let mut summary = format!("Crew: {}", self.crew.join(", "));
        for (voter, approve) in &self.votes {
            let verdict = if *approve { "Approved" } else { "Rejected" };
            summary.push_str(&format!("\n{voter}: {verdict}"));
        }
        summary
    }
}

/// The aggregate root for one game in one channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSession {
    /// Aggregate identifier for this game instance.
    pub id: Uuid,
    /// The channel hosting the game.
    pub channel_id: String,
    /// Current version (event count, monotonic per channel).
    pub(crate) version: i64,
    /// Development overrides: turn bypass, placeholder fill, act-as.
    pub(crate) debug: bool,
    /// Player impersonated by a debug session.
    pub(crate) acting_as: Option<String>,
    pub(crate) stage: GameStage,
    /// Players; in turn order once roles are dealt.
    pub(crate) players: Vec<Player>,
    /// Named characters chosen in the lobby.
    pub(crate) selected_characters: BTreeSet<Character>,
    pub(crate) turn_index: usize,
    pub(crate) hammer_index: usize,
    pub(crate) round: usize,
    pub(crate) proposed_quest: ProposedQuest,
    pub(crate) quest_records: [QuestRecord; ROUND_COUNT],
    pub(crate) assassination_target: Option<String>,
    pub(crate) status_message: Option<String>,
    /// Uncommitted events pending persistence.
    #[serde(skip)]
    uncommitted_events: Vec<GameEvent>,
}

impl GameSession {
    /// Creates an empty session.
    ///
    /// `base_version` continues the version sequence of any session this one
    /// replaces in the channel, so a stale writer can never match it.
    #[must_use]
    pub fn new(id: Uuid, channel_id: impl Into<String>, base_version: i64) -> Self {
        Self {
            id,
            channel_id: channel_id.into(),
            version: base_version,
            debug: false,
            acting_as: None,
            stage: GameStage::Lobby,
            players: Vec::new(),
            selected_characters: BTreeSet::new(),
            turn_index: 0,
            hammer_index: 0,
            round: 0,
            proposed_quest: ProposedQuest::default(),
            quest_records: Default::default(),
            assassination_target: None,
            status_message: None,
            uncommitted_events: Vec::new(),
        }
    }

    #[must_use]
    pub fn stage(&self) -> GameStage {
        self.stage
    }

    #[must_use]
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    #[must_use]
    pub fn player(&self, username: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.username == username)
    }

    #[must_use]
    pub fn selected_characters(&self) -> &BTreeSet<Character> {
        &self.selected_characters
    }

    #[must_use]
    pub fn turn_index(&self) -> usize {
        self.turn_index
    }

    #[must_use]
    pub fn hammer_index(&self) -> usize {
        self.hammer_index
    }

    #[must_use]
    pub fn round(&self) -> usize {
        self.round
    }

    #[must_use]
    pub fn proposed_quest(&self) -> &ProposedQuest {
        &self.proposed_quest
    }

    #[must_use]
    pub fn quest_record(&self, round: usize) -> Option<&QuestRecord> {
        self.quest_records.get(round)
    }

    #[must_use]
    pub fn assassination_target(&self) -> Option<&str> {
        self.assassination_target.as_deref()
    }

    #[must_use]
    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    #[must_use]
    pub fn is_debug(&self) -> bool {
        self.debug
    }

    #[must_use]
    pub fn acting_as(&self) -> Option<&str> {
        self.acting_as.as_deref()
    }

    /// The player whose turn it is to propose a crew.
    #[must_use]
    pub fn current_proposer(&self) -> Option<&Player> {
        self.players
            .iter()
            .find(|p| p.turn_order == Some(self.turn_index))
    }

    /// Crew size for the current round.
    ///
    /// # Panics
    ///
    /// Panics if called before roles are dealt; only in-game stages consult it.
    #[must_use]
    pub fn required_crew_size(&self) -> usize {
        crew_size(self.players.len(), self.round)
    }

    /// Returns the next sequence number for a new event.
    fn next_sequence_number(&self) -> i64 {
        self.version + 1
    }

    /// Builds an event, applies it, and queues it for persistence.
    ///
    /// Only called once an operation has passed every check.
    fn record(&mut self, kind: GameEventKind, correlation_id: Uuid, clock: &dyn Clock) {
        let event = GameEvent {
            metadata: EventMetadata {
                event_id: Uuid::new_v4(),
                event_type: kind.event_type().to_owned(),
                aggregate_id: self.id,
                sequence_number: self.next_sequence_number(),
                correlation_id,
                causation_id: correlation_id,
                occurred_at: clock.now(),
            },
            kind,
        };
        self.apply(&event);
        self.uncommitted_events.push(event);
    }

    fn ensure_stage(&self, action: &'static str, allowed: GameStage) -> Result<(), DomainError> {
        if self.stage == allowed {
            return Ok(());
        }
        if self.debug {
            return Err(DomainError::NoOpIgnored(format!(
                "{action} is not available during {}",
                self.stage
            )));
        }
        Err(DomainError::InvalidStageForAction {
            action,
            stage: self.stage.to_string(),
        })
    }

    fn require_player(&self, username: &str) -> Result<&Player, DomainError> {
        self.player(username)
            .ok_or_else(|| DomainError::UnknownPlayer(username.to_owned()))
    }

    /// Checks that `username` may act in the current stage.
    ///
    /// Proposals belong to the current proposer, votes to anyone, quest cards
    /// to the crew, and the assassination to the Assassin.
    fn verify_turn(&self, username: &str) -> Result<(), DomainError> {
        let player = self.require_player(username)?;
        if self.debug {
            return Ok(());
        }
        let allowed = match self.stage {
            GameStage::ChooseQuest => player.turn_order == Some(self.turn_index),
            GameStage::VoteOnQuest => true,
            GameStage::CompleteQuest => self.proposed_quest.contains(username),
            GameStage::Assassinate => player.holds(Character::Assassin),
            GameStage::Lobby | GameStage::Won | GameStage::Lost => false,
        };
        if allowed {
            Ok(())
        } else {
            Err(DomainError::NotPlayersTurn {
                username: username.to_owned(),
            })
        }
    }

    /// Opens the lobby with the host as its first player.
    pub fn open_lobby(
        &mut self,
        host: &PlayerAddress,
        debug: bool,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) {
        let kind = GameEventKind::LobbyOpened(LobbyOpened {
            session_id: self.id,
            channel_id: self.channel_id.clone(),
            host_username: host.username.clone(),
            host_user_id: host.user_id.clone(),
            debug,
        });
        self.record(kind, correlation_id, clock);
    }

    /// Dispatches an inbound action.
    ///
    /// In debug sessions with an impersonation target, in-game actions are
    /// performed as that player.
    ///
    /// # Errors
    ///
    /// Returns the `DomainError` of the dispatched operation; the session is
    /// unchanged whenever an error is returned.
    pub fn handle(
        &mut self,
        actor: &PlayerAddress,
        action: &GameAction,
        correlation_id: Uuid,
        clock: &dyn Clock,
        rng: &mut dyn DeterministicRng,
    ) -> Result<(), DomainError> {
        let username = match (&self.acting_as, self.debug && action.honours_acting_as()) {
            (Some(target), true) => target.clone(),
            _ => actor.username.clone(),
        };

        match action {
            GameAction::JoinLobby => self.join_lobby(actor, correlation_id, clock),
            GameAction::LeaveLobby => self.leave_lobby(&actor.username, correlation_id, clock),
            GameAction::ToggleCharacter { character } => {
                self.toggle_character(*character, correlation_id, clock)
            }
            GameAction::StartGame => self.start_game(correlation_id, clock, rng),
            GameAction::ActAs { username } => self.act_as(username, correlation_id, clock),
            GameAction::Nominate { target } => {
                self.nominate(&username, target, correlation_id, clock)
            }
            GameAction::SubmitQuest => self.submit_quest(&username, correlation_id, clock),
            GameAction::Vote { approve } => self.vote(&username, *approve, correlation_id, clock),
            GameAction::CompleteQuest { succeed } => {
                self.complete_quest(&username, *succeed, correlation_id, clock)
            }
            GameAction::SetAssassinationTarget { target } => {
                self.set_assassination_target(&username, target, correlation_id, clock)
            }
            GameAction::Assassinate => self.assassinate(&username, correlation_id, clock),
        }
    }

    /// Adds a player to the lobby, replacing any entry with the same username.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidStageForAction` outside the lobby.
    pub fn join_lobby(
        &mut self,
        player: &PlayerAddress,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.ensure_stage("join_lobby", GameStage::Lobby)?;
        let kind = GameEventKind::PlayerJoined(PlayerJoined {
            username: player.username.clone(),
            user_id: player.user_id.clone(),
        });
        self.record(kind, correlation_id, clock);
        Ok(())
    }

    /// Removes a player from the lobby.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidStageForAction` outside the lobby and
    /// `DomainError::NoOpIgnored` if the player had not joined.
    pub fn leave_lobby(
        &mut self,
        username: &str,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.ensure_stage("leave_lobby", GameStage::Lobby)?;
        if self.player(username).is_none() {
            return Err(DomainError::NoOpIgnored(format!(
                "{username} is not in the lobby"
            )));
        }
        let kind = GameEventKind::PlayerLeft(PlayerLeft {
            username: username.to_owned(),
        });
        self.record(kind, correlation_id, clock);
        Ok(())
    }

    /// Adds or removes an optional character; Percival and Morgana move together.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for characters that cannot be toggled.
    pub fn toggle_character(
        &mut self,
        character: Character,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.ensure_stage("toggle_character", GameStage::Lobby)?;
        if !character.is_optional() {
            return Err(DomainError::Validation(format!(
                "{} cannot be added or removed",
                character.name()
            )));
        }
        let selected = !self.selected_characters.contains(&character);
        let characters = std::iter::once(character)
            .chain(character.linked())
            .collect();
        let kind = GameEventKind::CharacterToggled(CharacterToggled {
            characters,
            selected,
        });
        self.record(kind, correlation_id, clock);
        Ok(())
    }

    /// Impersonates a player for subsequent in-game actions.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` outside debug sessions and
    /// `DomainError::UnknownPlayer` for a username not in the session.
    pub fn act_as(
        &mut self,
        username: &str,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        if !self.debug {
            return Err(DomainError::Validation(
                "acting as another player requires a debug session".to_owned(),
            ));
        }
        self.require_player(username)?;
        let kind = GameEventKind::ActingAsSet(ActingAsSet {
            username: username.to_owned(),
        });
        self.record(kind, correlation_id, clock);
        Ok(())
    }

    /// Deals roles and begins the first proposal.
    ///
    /// Debug sessions top the table up with placeholder players instead of
    /// failing on the minimum.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InsufficientPlayers` or
    /// `DomainError::TooManyPlayers` when the table size is out of bounds.
    pub fn start_game(
        &mut self,
        correlation_id: Uuid,
        clock: &dyn Clock,
        rng: &mut dyn DeterministicRng,
    ) -> Result<(), DomainError> {
        self.ensure_stage("start_game", GameStage::Lobby)?;

        let required = minimum_players_for(&self.selected_characters);
        let mut seats = self.players.clone();
        if seats.len() < required {
            if !self.debug {
                return Err(DomainError::InsufficientPlayers {
                    required,
                    actual: seats.len(),
                });
            }
            let mut suffix = 0;
            while seats.len() < required {
                let username = format!("placeholder-{suffix}");
                suffix += 1;
                if seats.iter().all(|p| p.username != username) {
                    seats.push(Player::placeholder(username));
                }
            }
        }
        if seats.len() > MAX_PLAYERS {
            return Err(DomainError::TooManyPlayers {
                maximum: MAX_PLAYERS,
                actual: seats.len(),
            });
        }

        let players = deal_roles(&seats, &self.selected_characters, rng)?;
        self.record(
            GameEventKind::RolesDealt(RolesDealt { players }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Adds `target` to the proposed crew, or removes them if already on it.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotPlayersTurn` unless `username` is the current
    /// proposer, `DomainError::UnknownPlayer` for an unknown target, and
    /// `DomainError::NoOpIgnored` when adding to a full crew.
    pub fn nominate(
        &mut self,
        username: &str,
        target: &str,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.ensure_stage("nominate", GameStage::ChooseQuest)?;
        self.verify_turn(username)?;
        self.require_player(target)?;

        let added = !self.proposed_quest.contains(target);
        let size = self.required_crew_size();
        if added && self.proposed_quest.crew.len() >= size {
            return Err(DomainError::NoOpIgnored(format!(
                "the crew already has {size} players"
            )));
        }

        let kind = GameEventKind::CrewMemberToggled(CrewMemberToggled {
            username: target.to_owned(),
            added,
        });
        self.record(kind, correlation_id, clock);
        Ok(())
    }

    /// Puts the proposed crew to the vote once it is the required size.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotPlayersTurn` unless `username` is the current
    /// proposer and `DomainError::NoOpIgnored` if the crew is the wrong size.
    pub fn submit_quest(
        &mut self,
        username: &str,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.ensure_stage("submit_quest", GameStage::ChooseQuest)?;
        self.verify_turn(username)?;

        let size = self.required_crew_size();
        let proposed = self.proposed_quest.crew.len();
        if proposed != size {
            return Err(DomainError::NoOpIgnored(format!(
                "the crew needs {size} players, {proposed} proposed"
            )));
        }

        let kind = GameEventKind::QuestSubmitted(QuestSubmitted {
            crew: self.proposed_quest.crew.clone(),
        });
        self.record(kind, correlation_id, clock);
        Ok(())
    }

    /// Records a vote; the last vote resolves the proposal.
    ///
    /// A strict majority approves. A rejection passes the proposal to the
    /// next player, except at the hammer, where evil wins outright.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::UnknownPlayer` if the voter is not seated.
    pub fn vote(
        &mut self,
        username: &str,
        approve: bool,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.ensure_stage("vote", GameStage::VoteOnQuest)?;
        self.verify_turn(username)?;

        self.record(
            GameEventKind::VoteCast(VoteCast {
                username: username.to_owned(),
                approve,
            }),
            correlation_id,
            clock,
        );

        if self.proposed_quest.votes.len() < self.players.len() {
            return Ok(());
        }

        let (votes_for, votes_against) = self.proposed_quest.tally();
        let summary = self.proposed_quest.summary();
        if votes_for > votes_against {
            self.record(
                GameEventKind::ProposalApproved(ProposalApproved {
                    votes_for,
                    votes_against,
                    summary,
                }),
                correlation_id,
                clock,
            );
            return Ok(());
        }

        let at_hammer = self.turn_index == self.hammer_index;
        self.record(
            GameEventKind::ProposalRejected(ProposalRejected {
                votes_for,
                votes_against,
                summary,
            }),
            correlation_id,
            clock,
        );
        let next = if at_hammer {
            GameEventKind::GameEnded(GameEnded {
                winner: Team::Evil,
                reason: GameEndReason::ProposalsExhausted,
            })
        } else {
            GameEventKind::TurnPassed(TurnPassed {
                turn_index: (self.turn_index + 1) % self.players.len(),
            })
        };
        self.record(next, correlation_id, clock);
        Ok(())
    }

    /// Plays a quest card; the last card resolves the quest and moves the game on.
    ///
    /// Good players always contribute a success, whatever they submit.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotPlayersTurn` unless `username` is on the crew.
    pub fn complete_quest(
        &mut self,
        username: &str,
        succeed: bool,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.ensure_stage("complete_quest", GameStage::CompleteQuest)?;
        self.verify_turn(username)?;

        let success = self.require_player(username)?.is_good() || succeed;
        let round = self.round;
        self.record(
            GameEventKind::QuestContributed(QuestContributed {
                round,
                username: username.to_owned(),
                success,
            }),
            correlation_id,
            clock,
        );

        if self.quest_records[round].len() < self.required_crew_size() {
            return Ok(());
        }

        let player_count = self.players.len();
        let tally = resolve_quest(&self.quest_records[round], round, player_count);
        self.record(
            GameEventKind::QuestResolved(QuestResolved { round, tally }),
            correlation_id,
            clock,
        );

        let (succeeded, failed) = self.quest_totals();
        let next = if succeeded >= QUESTS_TO_WIN {
            GameEventKind::AssassinationStarted(AssassinationStarted {
                quests_succeeded: succeeded,
            })
        } else if failed >= QUESTS_TO_WIN {
            GameEventKind::GameEnded(GameEnded {
                winner: Team::Evil,
                reason: GameEndReason::QuestsFailed,
            })
        } else {
            let turn_index = (self.turn_index + 1) % player_count;
            GameEventKind::RoundAdvanced(RoundAdvanced {
                round: round + 1,
                turn_index,
                hammer_index: (turn_index + HAMMER_OFFSET) % player_count,
            })
        };
        self.record(next, correlation_id, clock);
        Ok(())
    }

    /// Chooses (or changes) the Assassin's target.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotPlayersTurn` unless `username` is the Assassin
    /// and `DomainError::UnknownPlayer` for an unknown target.
    pub fn set_assassination_target(
        &mut self,
        username: &str,
        target: &str,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.ensure_stage("set_assassination_target", GameStage::Assassinate)?;
        self.verify_turn(username)?;
        self.require_player(target)?;

        let kind = GameEventKind::AssassinationTargetSet(AssassinationTargetSet {
            username: target.to_owned(),
        });
        self.record(kind, correlation_id, clock);
        Ok(())
    }

    /// Strikes the chosen target: finding Merlin wins the game for evil.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotPlayersTurn` unless `username` is the Assassin
    /// and `DomainError::NoOpIgnored` if no target has been chosen.
    pub fn assassinate(
        &mut self,
        username: &str,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.ensure_stage("assassinate", GameStage::Assassinate)?;
        self.verify_turn(username)?;

        let Some(target) = self.assassination_target.as_deref() else {
            return Err(DomainError::NoOpIgnored(
                "no assassination target has been chosen".to_owned(),
            ));
        };
        let found_merlin = self
            .player(target)
            .is_some_and(|p| p.holds(Character::Merlin));

        let ended = if found_merlin {
            GameEnded {
                winner: Team::Evil,
                reason: GameEndReason::MerlinAssassinated,
            }
        } else {
            GameEnded {
                winner: Team::Good,
                reason: GameEndReason::AssassinMissed,
            }
        };
        self.record(GameEventKind::GameEnded(ended), correlation_id, clock);
        Ok(())
    }

    /// Counts succeeded and failed quests over the rounds played so far.
    fn quest_totals(&self) -> (usize, usize) {
        let player_count = self.players.len();
        self.quest_records[..=self.round]
            .iter()
            .enumerate()
            .filter(|(_, record)| !record.is_empty())
            .fold((0, 0), |(ok, failed), (round, record)| {
                match resolve_quest(record, round, player_count).outcome {
                    QuestOutcome::Success => (ok + 1, failed),
                    QuestOutcome::Failure => (ok, failed + 1),
                }
            })
    }
}

impl AggregateRoot for GameSession {
    type Event = GameEvent;

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn apply(&mut self, event: &Self::Event) {
        match &event.kind {
            GameEventKind::LobbyOpened(payload) => {
                self.debug = payload.debug;
                self.stage = GameStage::Lobby;
                self.players = vec![Player::joined(
                    payload.host_username.clone(),
                    payload.host_user_id.clone(),
                )];
                self.selected_characters =
                    BTreeSet::from([Character::Merlin, Character::Assassin]);
            }
            GameEventKind::PlayerJoined(payload) => {
                self.players.retain(|p| p.username != payload.username);
                self.players.push(Player::joined(
                    payload.username.clone(),
                    payload.user_id.clone(),
                ));
            }
            GameEventKind::PlayerLeft(payload) => {
                self.players.retain(|p| p.username != payload.username);
                if self.acting_as.as_deref() == Some(payload.username.as_str()) {
                    self.acting_as = None;
                }
            }
            GameEventKind::CharacterToggled(payload) => {
                for character in &payload.characters {
                    if payload.selected {
                        self.selected_characters.insert(*character);
                    } else {
                        self.selected_characters.remove(character);
                    }
                }
            }
            GameEventKind::ActingAsSet(payload) => {
                self.acting_as = Some(payload.username.clone());
            }
            GameEventKind::RolesDealt(payload) => {
                self.players.clone_from(&payload.players);
                self.turn_index = 0;
                self.hammer_index = HAMMER_OFFSET % self.players.len().max(1);
                self.round = 0;
                self.proposed_quest = ProposedQuest::default();
                self.quest_records = Default::default();
                self.assassination_target = None;
                self.stage = GameStage::ChooseQuest;
                self.status_message = Some("Roles have been sent, check your DMs".to_owned());
            }
            GameEventKind::CrewMemberToggled(payload) => {
                if payload.added {
                    self.proposed_quest.crew.push(payload.username.clone());
                } else {
                    self.proposed_quest
                        .crew
                        .retain(|member| member != &payload.username);
                }
            }
            GameEventKind::QuestSubmitted(_) => {
                self.stage = GameStage::VoteOnQuest;
            }
            GameEventKind::VoteCast(payload) => {
                self.proposed_quest
                    .votes
                    .insert(payload.username.clone(), payload.approve);
            }
            GameEventKind::ProposalApproved(payload) => {
                self.stage = GameStage::CompleteQuest;
                self.status_message = Some(format!("Vote passed\n{}", payload.summary));
            }
            GameEventKind::ProposalRejected(payload) => {
                self.proposed_quest = ProposedQuest::default();
                self.status_message = Some(format!("Vote did not pass\n{}", payload.summary));
            }
            GameEventKind::TurnPassed(payload) => {
                self.turn_index = payload.turn_index;
                self.stage = GameStage::ChooseQuest;
            }
            GameEventKind::QuestContributed(payload) => {
                if let Some(record) = self.quest_records.get_mut(payload.round) {
                    record.record(payload.username.clone(), payload.success);
                }
            }
            GameEventKind::QuestResolved(payload) => {
                self.proposed_quest = ProposedQuest::default();
                self.status_message = Some(
                    match payload.tally.outcome {
                        QuestOutcome::Success => "Quest SUCCEEDED!",
                        QuestOutcome::Failure => "Quest FAILED!",
                    }
                    .to_owned(),
                );
            }
            GameEventKind::RoundAdvanced(payload) => {
                self.round = payload.round;
                self.turn_index = payload.turn_index;
                self.hammer_index = payload.hammer_index;
                self.stage = GameStage::ChooseQuest;
            }
            GameEventKind::AssassinationStarted(_) => {
                self.stage = GameStage::Assassinate;
            }
            GameEventKind::AssassinationTargetSet(payload) => {
                self.assassination_target = Some(payload.username.clone());
            }
            GameEventKind::GameEnded(payload) => {
                self.stage = match payload.winner {
                    Team::Good => GameStage::Won,
                    Team::Evil => GameStage::Lost,
                };
            }
        }
        self.version += 1;
    }

    fn uncommitted_events(&self) -> &[Self::Event] {
        &self.uncommitted_events
    }

    fn clear_uncommitted_events(&mut self) {
        self.uncommitted_events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use davalot_core::event::DomainEvent;
    use davalot_test_support::{FixedClock, MockRng};

    fn fixed_clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap())
    }

    fn address(username: &str) -> PlayerAddress {
        PlayerAddress {
            username: username.to_owned(),
            user_id: format!("U-{username}"),
        }
    }

    fn lobby_with(count: usize) -> GameSession {
        let clock = fixed_clock();
        let mut session = GameSession::new(Uuid::new_v4(), "C1", 0);
        session.open_lobby(&address("p0"), false, Uuid::new_v4(), &clock);
        for i in 1..count {
            session
                .join_lobby(&address(&format!("p{i}")), Uuid::new_v4(), &clock)
                .unwrap();
        }
        session.clear_uncommitted_events();
        session
    }

    /// A started game where `p{i}` holds `roles[i]` and has turn order `i`.
    fn started_with(roles: &[Character]) -> GameSession {
        let mut session = lobby_with(roles.len());
        let players = roles
            .iter()
            .enumerate()
            .map(|(i, role)| Player {
                username: format!("p{i}"),
                user_id: format!("U-p{i}"),
                turn_order: Some(i),
                character: Some(*role),
                placeholder: false,
            })
            .collect();
        session.record(
            GameEventKind::RolesDealt(RolesDealt { players }),
            Uuid::new_v4(),
            &fixed_clock(),
        );
        session.clear_uncommitted_events();
        session
    }

    fn five_player_game() -> GameSession {
        started_with(&[
            Character::Merlin,
            Character::Servant,
            Character::Servant,
            Character::Assassin,
            Character::Minion,
        ])
    }

    fn eight_player_game() -> GameSession {
        started_with(&[
            Character::Merlin,
            Character::Servant,
            Character::Servant,
            Character::Servant,
            Character::Percival,
            Character::Assassin,
            Character::Minion,
            Character::Morgana,
        ])
    }

    fn propose(session: &mut GameSession, crew: &[&str]) {
        let clock = fixed_clock();
        let proposer = session.current_proposer().unwrap().username.clone();
        for member in crew {
            session
                .nominate(&proposer, member, Uuid::new_v4(), &clock)
                .unwrap();
        }
        session
            .submit_quest(&proposer, Uuid::new_v4(), &clock)
            .unwrap();
    }

    fn vote_all(session: &mut GameSession, approve: bool) {
        let clock = fixed_clock();
        let voters: Vec<String> = session.players.iter().map(|p| p.username.clone()).collect();
        for voter in voters {
            session
                .vote(&voter, approve, Uuid::new_v4(), &clock)
                .unwrap();
        }
    }

    /// Proposes `crew`, approves it, and has `saboteurs` play fail cards.
    fn play_quest(session: &mut GameSession, crew: &[&str], saboteurs: &[&str]) {
        let clock = fixed_clock();
        propose(session, crew);
        vote_all(session, true);
        for member in crew {
            let succeed = !saboteurs.contains(member);
            session
                .complete_quest(member, succeed, Uuid::new_v4(), &clock)
                .unwrap();
        }
    }

    fn assert_unchanged(before: &GameSession, after: &GameSession) {
        assert_eq!(
            serde_json::to_value(before).unwrap(),
            serde_json::to_value(after).unwrap()
        );
        assert_eq!(
            before.uncommitted_events().len(),
            after.uncommitted_events().len()
        );
    }

    // --- lobby ---

    #[test]
    fn test_open_lobby_seats_host_with_mandatory_characters() {
        let clock = fixed_clock();
        let mut session = GameSession::new(Uuid::new_v4(), "C1", 0);

        session.open_lobby(&address("alice"), false, Uuid::new_v4(), &clock);

        assert_eq!(session.stage(), GameStage::Lobby);
        assert_eq!(session.players().len(), 1);
        assert_eq!(session.players()[0].username, "alice");
        assert_eq!(
            session.selected_characters(),
            &BTreeSet::from([Character::Merlin, Character::Assassin])
        );
        assert_eq!(session.version(), 1);
        let events = session.uncommitted_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), "game.lobby_opened");
        assert_eq!(events[0].metadata().sequence_number, 1);
    }

    #[test]
    fn test_new_session_continues_version_of_replaced_session() {
        let clock = fixed_clock();
        let mut session = GameSession::new(Uuid::new_v4(), "C1", 41);
        session.open_lobby(&address("alice"), false, Uuid::new_v4(), &clock);

        assert_eq!(session.version(), 42);
        assert_eq!(session.uncommitted_events()[0].metadata().sequence_number, 42);
    }

    #[test]
    fn test_rejoining_replaces_existing_entry() {
        let clock = fixed_clock();
        let mut session = lobby_with(3);

        session
            .join_lobby(
                &PlayerAddress {
                    username: "p1".to_owned(),
                    user_id: "U-new".to_owned(),
                },
                Uuid::new_v4(),
                &clock,
            )
            .unwrap();

        assert_eq!(session.players().len(), 3);
        assert_eq!(session.player("p1").unwrap().user_id, "U-new");
    }

    #[test]
    fn test_leave_lobby_removes_player() {
        let mut session = lobby_with(3);

        session
            .leave_lobby("p2", Uuid::new_v4(), &fixed_clock())
            .unwrap();

        assert!(session.player("p2").is_none());
        assert_eq!(session.players().len(), 2);
    }

    #[test]
    fn test_leave_lobby_for_absent_player_is_ignored() {
        let mut session = lobby_with(3);
        let before = session.clone();

        let result = session.leave_lobby("zed", Uuid::new_v4(), &fixed_clock());

        assert!(matches!(result, Err(DomainError::NoOpIgnored(_))));
        assert_unchanged(&before, &session);
    }

    #[test]
    fn test_join_after_start_is_invalid_stage() {
        let mut session = five_player_game();
        let before = session.clone();

        let result = session.join_lobby(&address("late"), Uuid::new_v4(), &fixed_clock());

        match result.unwrap_err() {
            DomainError::InvalidStageForAction { action, stage } => {
                assert_eq!(action, "join_lobby");
                assert_eq!(stage, "ChooseQuest");
            }
            other => panic!("expected InvalidStageForAction, got {other:?}"),
        }
        assert_unchanged(&before, &session);
    }

    #[test]
    fn test_toggling_percival_also_toggles_morgana() {
        let clock = fixed_clock();
        let mut session = lobby_with(5);

        session
            .toggle_character(Character::Percival, Uuid::new_v4(), &clock)
            .unwrap();
        assert!(session.selected_characters().contains(&Character::Percival));
        assert!(session.selected_characters().contains(&Character::Morgana));

        session
            .toggle_character(Character::Morgana, Uuid::new_v4(), &clock)
            .unwrap();
        assert!(!session.selected_characters().contains(&Character::Percival));
        assert!(!session.selected_characters().contains(&Character::Morgana));
    }

    #[test]
    fn test_mandatory_characters_cannot_be_toggled() {
        let mut session = lobby_with(5);
        let before = session.clone();

        let result = session.toggle_character(Character::Merlin, Uuid::new_v4(), &fixed_clock());

        assert!(matches!(result, Err(DomainError::Validation(_))));
        assert_unchanged(&before, &session);
    }

    // --- start ---

    #[test]
    fn test_start_game_deals_roles_and_sets_turns() {
        let mut session = lobby_with(5);

        session
            .start_game(Uuid::new_v4(), &fixed_clock(), &mut MockRng)
            .unwrap();

        assert_eq!(session.stage(), GameStage::ChooseQuest);
        assert_eq!(session.turn_index(), 0);
        assert_eq!(session.hammer_index(), 4);
        assert_eq!(session.round(), 0);
        assert_eq!(session.players().len(), 5);
        for (index, player) in session.players().iter().enumerate() {
            assert_eq!(player.turn_order, Some(index));
            assert!(player.character.is_some());
        }
        assert_eq!(
            session.status_message(),
            Some("Roles have been sent, check your DMs")
        );
        assert_eq!(
            session.uncommitted_events()[0].event_type(),
            "game.roles_dealt"
        );
    }

    #[test]
    fn test_start_game_with_too_few_players_changes_nothing() {
        let mut session = lobby_with(4);
        let before = session.clone();

        let result = session.start_game(Uuid::new_v4(), &fixed_clock(), &mut MockRng);

        match result.unwrap_err() {
            DomainError::InsufficientPlayers { required, actual } => {
                assert_eq!(required, 5);
                assert_eq!(actual, 4);
            }
            other => panic!("expected InsufficientPlayers, got {other:?}"),
        }
        assert_unchanged(&before, &session);
    }

    #[test]
    fn test_start_game_requires_seven_with_three_evil_roles() {
        let clock = fixed_clock();
        let mut session = lobby_with(6);
        session
            .toggle_character(Character::Mordred, Uuid::new_v4(), &clock)
            .unwrap();
        session
            .toggle_character(Character::Oberon, Uuid::new_v4(), &clock)
            .unwrap();

        let result = session.start_game(Uuid::new_v4(), &clock, &mut MockRng);

        assert!(matches!(
            result,
            Err(DomainError::InsufficientPlayers {
                required: 7,
                actual: 6
            })
        ));
    }

    #[test]
    fn test_start_game_with_too_many_players_fails() {
        let mut session = lobby_with(11);
        let before = session.clone();

        let result = session.start_game(Uuid::new_v4(), &fixed_clock(), &mut MockRng);

        assert!(matches!(
            result,
            Err(DomainError::TooManyPlayers {
                maximum: 10,
                actual: 11
            })
        ));
        assert_unchanged(&before, &session);
    }

    #[test]
    fn test_debug_start_fills_table_with_placeholders() {
        let clock = fixed_clock();
        let mut session = GameSession::new(Uuid::new_v4(), "C1", 0);
        session.open_lobby(&address("dev"), true, Uuid::new_v4(), &clock);

        session
            .start_game(Uuid::new_v4(), &clock, &mut MockRng)
            .unwrap();

        assert_eq!(session.players().len(), 5);
        assert_eq!(session.players().iter().filter(|p| p.placeholder).count(), 4);
        assert_eq!(session.stage(), GameStage::ChooseQuest);
    }

    #[test]
    fn test_debug_placeholders_never_reuse_a_seated_username() {
        let clock = fixed_clock();
        let mut session = GameSession::new(Uuid::new_v4(), "C1", 0);
        session.open_lobby(&address("host"), true, Uuid::new_v4(), &clock);
        session
            .join_lobby(&address("placeholder-0"), Uuid::new_v4(), &clock)
            .unwrap();

        session
            .start_game(Uuid::new_v4(), &clock, &mut MockRng)
            .unwrap();

        let names: BTreeSet<&str> = session
            .players()
            .iter()
            .map(|p| p.username.as_str())
            .collect();
        assert_eq!(names.len(), 5);
        assert!(names.contains("placeholder-0"));
        assert!(names.contains("placeholder-3"));
        let real = session.player("placeholder-0").unwrap();
        assert!(!real.placeholder);
    }

    // --- proposals ---

    #[test]
    fn test_only_current_proposer_may_nominate() {
        let mut session = five_player_game();
        let before = session.clone();

        let result = session.nominate("p2", "p1", Uuid::new_v4(), &fixed_clock());

        match result.unwrap_err() {
            DomainError::NotPlayersTurn { username } => assert_eq!(username, "p2"),
            other => panic!("expected NotPlayersTurn, got {other:?}"),
        }
        assert_unchanged(&before, &session);
    }

    #[test]
    fn test_nominate_toggles_membership() {
        let clock = fixed_clock();
        let mut session = five_player_game();

        session.nominate("p0", "p3", Uuid::new_v4(), &clock).unwrap();
        assert_eq!(session.proposed_quest().crew(), ["p3".to_owned()]);

        session.nominate("p0", "p3", Uuid::new_v4(), &clock).unwrap();
        assert!(session.proposed_quest().crew().is_empty());
    }

    #[test]
    fn test_nominate_unknown_target_fails() {
        let mut session = five_player_game();

        let result = session.nominate("p0", "ghost", Uuid::new_v4(), &fixed_clock());

        assert!(matches!(result, Err(DomainError::UnknownPlayer(name)) if name == "ghost"));
    }

    #[test]
    fn test_crew_never_exceeds_required_size() {
        let clock = fixed_clock();
        let mut session = five_player_game();
        session.nominate("p0", "p0", Uuid::new_v4(), &clock).unwrap();
        session.nominate("p0", "p1", Uuid::new_v4(), &clock).unwrap();

        let result = session.nominate("p0", "p2", Uuid::new_v4(), &clock);

        assert!(matches!(result, Err(DomainError::NoOpIgnored(_))));
        assert_eq!(session.proposed_quest().crew().len(), 2);
    }

    #[test]
    fn test_submit_with_wrong_crew_size_is_ignored() {
        let clock = fixed_clock();
        let mut session = five_player_game();
        session.nominate("p0", "p1", Uuid::new_v4(), &clock).unwrap();
        let before = session.clone();

        let result = session.submit_quest("p0", Uuid::new_v4(), &clock);

        assert!(matches!(result, Err(DomainError::NoOpIgnored(_))));
        assert_eq!(session.stage(), GameStage::ChooseQuest);
        assert_unchanged(&before, &session);
    }

    #[test]
    fn test_submit_full_crew_opens_vote() {
        let mut session = five_player_game();

        propose(&mut session, &["p0", "p1"]);

        assert_eq!(session.stage(), GameStage::VoteOnQuest);
    }

    // --- votes ---

    #[test]
    fn test_majority_approval_sends_crew_on_quest() {
        let clock = fixed_clock();
        let mut session = five_player_game();
        propose(&mut session, &["p0", "p1"]);

        for (voter, approve) in [("p0", true), ("p1", true), ("p2", true), ("p3", false)] {
            session.vote(voter, approve, Uuid::new_v4(), &clock).unwrap();
            assert_eq!(session.stage(), GameStage::VoteOnQuest);
        }
        session.vote("p4", false, Uuid::new_v4(), &clock).unwrap();

        assert_eq!(session.stage(), GameStage::CompleteQuest);
        let message = session.status_message().unwrap();
        assert!(message.starts_with("Vote passed"));
        assert!(message.contains("p3: Rejected"));
    }

    #[test]
    fn test_tied_vote_is_a_rejection() {
        let clock = fixed_clock();
        let mut session = started_with(&[
            Character::Merlin,
            Character::Servant,
            Character::Servant,
            Character::Servant,
            Character::Assassin,
            Character::Minion,
        ]);
        propose(&mut session, &["p0", "p1"]);

        for (i, approve) in [true, true, true, false, false, false].into_iter().enumerate() {
            session
                .vote(&format!("p{i}"), approve, Uuid::new_v4(), &clock)
                .unwrap();
        }

        assert_eq!(session.stage(), GameStage::ChooseQuest);
        assert_eq!(session.turn_index(), 1);
        assert!(session.proposed_quest().crew().is_empty());
        assert!(session.proposed_quest().votes().is_empty());
        assert!(session.status_message().unwrap().starts_with("Vote did not pass"));
    }

    #[test]
    fn test_revote_overwrites_previous_vote() {
        let clock = fixed_clock();
        let mut session = five_player_game();
        propose(&mut session, &["p0", "p1"]);

        session.vote("p0", false, Uuid::new_v4(), &clock).unwrap();
        session.vote("p0", true, Uuid::new_v4(), &clock).unwrap();

        assert_eq!(session.proposed_quest().votes().len(), 1);
        assert_eq!(session.proposed_quest().votes().get("p0"), Some(&true));
    }

    #[test]
    fn test_vote_by_unknown_player_fails() {
        let mut session = five_player_game();
        propose(&mut session, &["p0", "p1"]);

        let result = session.vote("ghost", true, Uuid::new_v4(), &fixed_clock());

        assert!(matches!(result, Err(DomainError::UnknownPlayer(_))));
    }

    #[test]
    fn test_rejections_wrap_turn_modulo_player_count() {
        let mut session = five_player_game();
        session.turn_index = 3;
        session.hammer_index = 2;

        propose(&mut session, &["p0", "p1"]);
        vote_all(&mut session, false);
        assert_eq!(session.turn_index(), 4);

        propose(&mut session, &["p0", "p1"]);
        vote_all(&mut session, false);
        assert_eq!(session.turn_index(), 0);
        assert_eq!(session.stage(), GameStage::ChooseQuest);
    }

    #[test]
    fn test_rejected_hammer_loses_immediately() {
        let mut session = five_player_game();
        for _ in 0..4 {
            propose(&mut session, &["p0", "p1"]);
            vote_all(&mut session, false);
            assert_eq!(session.stage(), GameStage::ChooseQuest);
        }
        assert_eq!(session.turn_index(), session.hammer_index());

        propose(&mut session, &["p0", "p1"]);
        vote_all(&mut session, false);

        assert_eq!(session.stage(), GameStage::Lost);
        let last = session.uncommitted_events().last().unwrap();
        assert_eq!(last.event_type(), "game.game_ended");
    }

    #[test]
    fn test_rejected_hammer_loses_even_after_two_successes() {
        let mut session = five_player_game();
        play_quest(&mut session, &["p0", "p1"], &[]);
        play_quest(&mut session, &["p0", "p1", "p2"], &[]);
        assert_eq!(session.round(), 2);
        session.turn_index = session.hammer_index;

        propose(&mut session, &["p0", "p1"]);
        vote_all(&mut session, false);

        assert_eq!(session.stage(), GameStage::Lost);
    }

    // --- quests ---

    #[test]
    fn test_only_crew_members_may_play_quest_cards() {
        let mut session = five_player_game();
        propose(&mut session, &["p0", "p1"]);
        vote_all(&mut session, true);
        let before = session.clone();

        let result = session.complete_quest("p3", false, Uuid::new_v4(), &fixed_clock());

        assert!(matches!(result, Err(DomainError::NotPlayersTurn { .. })));
        assert_unchanged(&before, &session);
    }

    #[test]
    fn test_good_player_fail_card_counts_as_success() {
        let mut session = five_player_game();

        play_quest(&mut session, &["p0", "p1"], &["p1"]);

        let record = session.quest_record(0).unwrap();
        assert_eq!(record.fails(), 0);
        assert_eq!(record.successes(), 2);
        assert_eq!(session.status_message(), Some("Quest SUCCEEDED!"));
    }

    #[test]
    fn test_single_fail_card_on_early_quest_still_succeeds() {
        let mut session = five_player_game();

        play_quest(&mut session, &["p0", "p3"], &["p3"]);

        assert_eq!(session.quest_record(0).unwrap().fails(), 1);
        assert_eq!(session.status_message(), Some("Quest SUCCEEDED!"));
    }

    #[test]
    fn test_two_fails_sink_a_quest() {
        let mut session = five_player_game();

        play_quest(&mut session, &["p0", "p3"], &["p3"]);
        play_quest(&mut session, &["p0", "p3", "p4"], &["p3", "p4"]);

        assert_eq!(session.status_message(), Some("Quest FAILED!"));
    }

    #[test]
    fn test_round_advance_moves_turn_and_hammer() {
        let mut session = five_player_game();

        play_quest(&mut session, &["p0", "p1"], &[]);

        assert_eq!(session.stage(), GameStage::ChooseQuest);
        assert_eq!(session.round(), 1);
        assert_eq!(session.turn_index(), 1);
        assert_eq!(session.hammer_index(), (1 + 4) % 5);
        assert!(session.proposed_quest().crew().is_empty());
    }

    #[test]
    fn test_three_successes_begin_assassination() {
        let mut session = five_player_game();

        play_quest(&mut session, &["p0", "p1"], &[]);
        play_quest(&mut session, &["p0", "p1", "p2"], &[]);
        play_quest(&mut session, &["p1", "p2"], &[]);

        assert_eq!(session.stage(), GameStage::Assassinate);
        assert_eq!(session.round(), 2);
    }

    #[test]
    fn test_three_failures_lose_without_playing_remaining_rounds() {
        let mut session = five_player_game();

        play_quest(&mut session, &["p3", "p4"], &["p3", "p4"]);
        play_quest(&mut session, &["p0", "p3", "p4"], &["p3", "p4"]);
        assert_eq!(session.stage(), GameStage::ChooseQuest);
        play_quest(&mut session, &["p3", "p4"], &["p3", "p4"]);

        assert_eq!(session.stage(), GameStage::Lost);
        assert_eq!(session.round(), 2);
    }

    #[test]
    fn test_fourth_quest_with_eight_players_fails_on_one_fail() {
        let mut session = eight_player_game();
        play_quest(&mut session, &["p0", "p1", "p2"], &[]);
        play_quest(&mut session, &["p0", "p1", "p2", "p3"], &[]);
        play_quest(&mut session, &["p5", "p6", "p7", "p4"], &["p5", "p6"]);
        assert_eq!(session.round(), 3);

        play_quest(&mut session, &["p0", "p1", "p2", "p3", "p5"], &["p5"]);

        let tally = resolve_quest(session.quest_record(3).unwrap(), 3, 8);
        assert_eq!(tally.outcome, QuestOutcome::Failure);
        assert_eq!(session.status_message(), Some("Quest FAILED!"));
        assert_eq!(session.round(), 4);
    }

    // --- assassination ---

    fn assassination_phase() -> GameSession {
        let mut session = five_player_game();
        play_quest(&mut session, &["p0", "p1"], &[]);
        play_quest(&mut session, &["p0", "p1", "p2"], &[]);
        play_quest(&mut session, &["p1", "p2"], &[]);
        session.clear_uncommitted_events();
        session
    }

    #[test]
    fn test_assassinating_merlin_loses() {
        let clock = fixed_clock();
        let mut session = assassination_phase();

        session
            .set_assassination_target("p3", "p0", Uuid::new_v4(), &clock)
            .unwrap();
        assert_eq!(session.stage(), GameStage::Assassinate);
        session.assassinate("p3", Uuid::new_v4(), &clock).unwrap();

        assert_eq!(session.stage(), GameStage::Lost);
    }

    #[test]
    fn test_assassinating_anyone_else_wins() {
        let clock = fixed_clock();
        let mut session = assassination_phase();

        session
            .set_assassination_target("p3", "p2", Uuid::new_v4(), &clock)
            .unwrap();
        session.assassinate("p3", Uuid::new_v4(), &clock).unwrap();

        assert_eq!(session.stage(), GameStage::Won);
    }

    #[test]
    fn test_assassinate_without_target_is_ignored() {
        let mut session = assassination_phase();
        let before = session.clone();

        let result = session.assassinate("p3", Uuid::new_v4(), &fixed_clock());

        assert!(matches!(result, Err(DomainError::NoOpIgnored(_))));
        assert_unchanged(&before, &session);
    }

    #[test]
    fn test_only_assassin_may_choose_target() {
        let mut session = assassination_phase();

        let result = session.set_assassination_target("p4", "p0", Uuid::new_v4(), &fixed_clock());

        assert!(matches!(result, Err(DomainError::NotPlayersTurn { .. })));
        assert!(session.assassination_target().is_none());
    }

    // --- debug overrides ---

    #[test]
    fn test_debug_session_bypasses_turn_check() {
        let mut session = five_player_game();
        session.debug = true;

        session
            .nominate("p2", "p1", Uuid::new_v4(), &fixed_clock())
            .unwrap();

        assert_eq!(session.proposed_quest().crew(), ["p1".to_owned()]);
    }

    #[test]
    fn test_debug_session_treats_wrong_stage_as_no_op() {
        let mut session = five_player_game();
        session.debug = true;

        let result = session.vote("p0", true, Uuid::new_v4(), &fixed_clock());

        assert!(matches!(result, Err(DomainError::NoOpIgnored(_))));
    }

    #[test]
    fn test_act_as_requires_debug_session() {
        let mut session = five_player_game();

        let result = session.act_as("p1", Uuid::new_v4(), &fixed_clock());

        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_handle_uses_impersonated_player_in_debug_session() {
        let clock = fixed_clock();
        let mut session = five_player_game();
        session.debug = true;
        session
            .handle(
                &address("p0"),
                &GameAction::ActAs {
                    username: "p3".to_owned(),
                },
                Uuid::new_v4(),
                &clock,
                &mut MockRng,
            )
            .unwrap();
        propose(&mut session, &["p0", "p1"]);

        session
            .handle(
                &address("p0"),
                &GameAction::Vote { approve: true },
                Uuid::new_v4(),
                &clock,
                &mut MockRng,
            )
            .unwrap();

        assert_eq!(session.acting_as(), Some("p3"));
        assert_eq!(session.proposed_quest().votes().get("p3"), Some(&true));
        assert!(session.proposed_quest().votes().get("p0").is_none());
    }

    // --- snapshots ---

    #[test]
    fn test_session_survives_serde_round_trip() {
        let mut session = five_player_game();
        propose(&mut session, &["p0", "p1"]);

        let value = serde_json::to_value(&session).unwrap();
        let restored: GameSession = serde_json::from_value(value).unwrap();

        assert_eq!(restored.stage(), GameStage::VoteOnQuest);
        assert_eq!(restored.proposed_quest(), session.proposed_quest());
        assert_eq!(restored.players(), session.players());
        assert_eq!(restored.version(), session.version());
        assert!(restored.uncommitted_events().is_empty());
    }
}
