//! Crew sizes per round and quest resolution.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Number of quests in a game.
pub const ROUND_COUNT: usize = 5;

/// Index of the fourth quest, where large games fail on a single fail card.
const FOURTH_QUEST: usize = 3;

/// Player count above which the fourth quest needs only one fail.
const FOURTH_QUEST_STRICT_ABOVE: usize = 6;

/// Crew sizes for rounds 0..5, indexed by `player_count - 5`.
const CREW_SIZES: [[usize; ROUND_COUNT]; 6] = [
    [2, 3, 2, 3, 3],
    [2, 3, 4, 3, 4],
    [2, 3, 3, 4, 4],
    [3, 4, 4, 5, 5],
    [3, 4, 4, 5, 5],
    [3, 4, 4, 5, 5],
];

/// Returns the crew sizes for every round, or `None` for an unsupported
/// player count.
#[must_use]
pub fn crew_sizes(player_count: usize) -> Option<&'static [usize; ROUND_COUNT]> {
    player_count
        .checked_sub(5)
        .and_then(|offset| CREW_SIZES.get(offset))
}

/// Returns the crew size for one round.
///
/// # Panics
///
/// Panics if `player_count` is outside 5..=10 or `round` is outside 0..5.
/// Sessions only consult the table after the start gate has enforced both.
#[must_use]
pub fn crew_size(player_count: usize, round: usize) -> usize {
    crew_sizes(player_count).expect("player count validated at game start")[round]
}

/// The result of a quest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestOutcome {
    Success,
    Failure,
}

/// Counted contributions of a resolved quest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestTally {
    pub outcome: QuestOutcome,
    pub successes: usize,
    pub fails: usize,
}

/// Contributions to one round's quest, keyed by username.
///
/// `true` is a success card.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestRecord {
    contributions: BTreeMap<String, bool>,
}

impl QuestRecord {
    /// Records (or overwrites) a contribution.
    pub fn record(&mut self, username: impl Into<String>, success: bool) {
        self.contributions.insert(username.into(), success);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.contributions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contributions.is_empty()
    }

    #[must_use]
    pub fn successes(&self) -> usize {
        self.contributions.values().filter(|v| **v).count()
    }

    #[must_use]
    pub fn fails(&self) -> usize {
        self.contributions.values().filter(|v| !**v).count()
    }

    #[must_use]
    pub fn contains(&self, username: &str) -> bool {
        self.contributions.contains_key(username)
    }
}

/// Resolves a round's contributions.
///
/// No fails is a success and two or more is a failure. A single fail
/// succeeds, except on the fourth quest of a game with more than six
/// players.
#[must_use]
pub fn resolve_quest(record: &QuestRecord, round: usize, player_count: usize) -> QuestTally {
    let fails = record.fails();
    let failed = match fails {
        0 => false,
        1 => round == FOURTH_QUEST && player_count > FOURTH_QUEST_STRICT_ABOVE,
        _ => true,
    };
    QuestTally {
        outcome: if failed {
            QuestOutcome::Failure
        } else {
            QuestOutcome::Success
        },
        successes: record.successes(),
        fails,
    }
}
