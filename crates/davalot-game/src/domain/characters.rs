//! The fixed catalog of playable characters.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The side a character plays for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    /// Loyal to the quests.
    Good,
    /// Sabotages the quests.
    Evil,
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Good => f.write_str("Good"),
            Self::Evil => f.write_str("Evil"),
        }
    }
}

/// A playable role.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Character {
    /// The good leader; sees most of the evil team.
    Merlin,
    /// Good filler role.
    Servant,
    /// Sees Merlin and Morgana without knowing which is which.
    Percival,
    /// Names the final assassination target.
    Assassin,
    /// Appears as Merlin to Percival.
    Morgana,
    /// Evil, but unknown to the rest of the evil team.
    Oberon,
    /// Evil, but hidden from Merlin.
    Mordred,
    /// Evil filler role.
    Minion,
}

impl Character {
    /// Human-readable name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Merlin => "Merlin",
            Self::Servant => "Loyal Servant of Arthur",
            Self::Percival => "Percival",
            Self::Assassin => "Assassin",
            Self::Morgana => "Morgana",
            Self::Oberon => "Oberon",
            Self::Mordred => "Mordred",
            Self::Minion => "Minion of Mordred",
        }
    }

    #[must_use]
    pub fn team(self) -> Team {
        match self {
            Self::Merlin | Self::Servant | Self::Percival => Team::Good,
            Self::Assassin | Self::Morgana | Self::Oberon | Self::Mordred | Self::Minion => {
                Team::Evil
            }
        }
    }

    #[must_use]
    pub fn is_good(self) -> bool {
        self.team() == Team::Good
    }

    #[must_use]
    pub fn is_evil(self) -> bool {
        self.team() == Team::Evil
    }

    /// Whether the lobby may add or remove this character.
    ///
    /// Merlin and the Assassin are always in play; filler roles are computed.
    #[must_use]
    pub fn is_optional(self) -> bool {
        matches!(
            self,
            Self::Mordred | Self::Percival | Self::Oberon | Self::Morgana
        )
    }

    /// The character that is selected and deselected together with this one.
    #[must_use]
    pub fn linked(self) -> Option<Self> {
        match self {
            Self::Percival => Some(Self::Morgana),
            Self::Morgana => Some(Self::Percival),
            _ => None,
        }
    }
}

impl fmt::Display for Character {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
