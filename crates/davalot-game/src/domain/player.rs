//! Players seated in a session.

use davalot_core::notifier::PlayerAddress;
use serde::{Deserialize, Serialize};

use super::characters::Character;

/// A participant in a game session.
///
/// `turn_order` and `character` are assigned once, when roles are dealt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Display username, unique within a session.
    pub username: String,
    /// Chat platform user identifier.
    pub user_id: String,
    /// Zero-based position in the proposal rotation.
    pub turn_order: Option<usize>,
    /// The dealt role.
    pub character: Option<Character>,
    /// Synthesized by the debug auto-fill; never messaged.
    #[serde(default)]
    pub placeholder: bool,
}

impl Player {
    /// A player who has joined the lobby but not been dealt a role.
    #[must_use]
    pub fn joined(username: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            user_id: user_id.into(),
            turn_order: None,
            character: None,
            placeholder: false,
        }
    }

    /// A stand-in player used to reach the minimum player count in debug sessions.
    #[must_use]
    pub fn placeholder(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            user_id: "placeholder".to_owned(),
            turn_order: None,
            character: None,
            placeholder: true,
        }
    }

    /// Where to deliver private messages for this player.
    #[must_use]
    pub fn address(&self) -> PlayerAddress {
        PlayerAddress {
            username: self.username.clone(),
            user_id: self.user_id.clone(),
        }
    }

    /// Whether the dealt role is on the good team. Undealt players count as good.
    #[must_use]
    pub fn is_good(&self) -> bool {
        self.character.is_none_or(Character::is_good)
    }

    #[must_use]
    pub fn is_evil(&self) -> bool {
        !self.is_good()
    }

    #[must_use]
    pub fn holds(&self, character: Character) -> bool {
        self.character == Some(character)
    }
}
