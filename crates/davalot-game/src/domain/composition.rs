//! Role composition and dealing.

use std::collections::BTreeSet;

use davalot_core::error::DomainError;
use davalot_core::rng::{DeterministicRng, PortRng};
use rand::seq::SliceRandom;
use serde::Serialize;

use super::characters::Character;
use super::player::Player;

/// The largest supported table.
pub const MAX_PLAYERS: usize = 10;

/// Minimum players needed for the number of evil roles selected.
#[must_use]
pub fn minimum_players(evil_role_count: usize) -> usize {
    match evil_role_count {
        4 => 10,
        3 => 7,
        _ => 5,
    }
}

/// Minimum players needed for a set of selected characters.
#[must_use]
pub fn minimum_players_for(selected: &BTreeSet<Character>) -> usize {
    minimum_players(selected.iter().filter(|c| c.is_evil()).count())
}

/// Number of good and evil seats at a table of `total_players`.
///
/// Nine players is a fixed 6/3 split rather than the general formula.
#[must_use]
pub fn required_slots(total_players: usize) -> (usize, usize) {
    if total_players == 9 {
        return (6, 3);
    }
    (
        (total_players + 1).div_ceil(2),
        total_players.saturating_sub(1) / 2,
    )
}

/// The roles that make up a deck.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleComposition {
    /// Named good characters, from the selection.
    pub named_good: Vec<Character>,
    /// Named evil characters, from the selection.
    pub named_evil: Vec<Character>,
    /// Loyal Servants padding the good side.
    pub servants: usize,
    /// Minions padding the evil side.
    pub minions: usize,
}

impl RoleComposition {
    /// Expands the composition into one card per seat.
    #[must_use]
    pub fn deck(&self) -> Vec<Character> {
        let mut deck: Vec<Character> = self
            .named_good
            .iter()
            .chain(self.named_evil.iter())
            .copied()
            .collect();
        deck.extend(std::iter::repeat_n(Character::Servant, self.servants));
        deck.extend(std::iter::repeat_n(Character::Minion, self.minions));
        deck
    }
}

/// Computes the deck composition for `total_players` given the selected roles,
/// padding each side with filler roles.
#[must_use]
pub fn required_composition(
    total_players: usize,
    selected: &BTreeSet<Character>,
) -> RoleComposition {
    let (good_slots, evil_slots) = required_slots(total_players);
    let named_good: Vec<Character> = selected.iter().copied().filter(|c| c.is_good()).collect();
    let named_evil: Vec<Character> = selected.iter().copied().filter(|c| c.is_evil()).collect();
    RoleComposition {
        servants: good_slots.saturating_sub(named_good.len()),
        minions: evil_slots.saturating_sub(named_evil.len()),
        named_good,
        named_evil,
    }
}

/// Deals a role to every player.
///
/// The deck and the seating order are shuffled independently; the shuffled
/// players receive turn orders `0..n` and the shuffled deck is zipped onto
/// them. The returned players are in turn order.
///
/// # Errors
///
/// Returns `DomainError::InsufficientPlayers` below the minimum for the
/// selected roles and `DomainError::TooManyPlayers` above [`MAX_PLAYERS`].
pub fn deal_roles(
    players: &[Player],
    selected: &BTreeSet<Character>,
    rng: &mut dyn DeterministicRng,
) -> Result<Vec<Player>, DomainError> {
    let required = minimum_players_for(selected);
    if players.len() < required {
        return Err(DomainError::InsufficientPlayers {
            required,
            actual: players.len(),
        });
    }
    if players.len() > MAX_PLAYERS {
        return Err(DomainError::TooManyPlayers {
            maximum: MAX_PLAYERS,
            actual: players.len(),
        });
    }

    let mut rng = PortRng::new(rng);
    let mut deck = required_composition(players.len(), selected).deck();
    deck.shuffle(&mut rng);

    let mut seated = players.to_vec();
    seated.shuffle(&mut rng);

    Ok(seated
        .into_iter()
        .zip(deck)
        .enumerate()
        .map(|(turn_order, (mut player, character))| {
            player.turn_order = Some(turn_order);
            player.character = Some(character);
            player
        })
        .collect())
}
