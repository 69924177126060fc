//! Private role-reveal messages sent when roles are dealt.

use davalot_core::notifier::PlayerAddress;

use super::aggregates::GameSession;
use super::characters::Character;
use super::player::Player;

/// Composes the reveal message for `player` at a table of `players`.
///
/// Everyone learns their role and team. Merlin sees every evil player except
/// Mordred, evil players see each other except Oberon, and Percival sees
/// Merlin and Morgana without learning which is which.
#[must_use]
pub fn role_reveal_message(player: &Player, players: &[Player]) -> String {
    let Some(character) = player.character else {
        return "You have not been dealt a character yet".to_owned();
    };
    let mut message = format!(
        "Your character is: {}\nTeam is {}",
        character.name(),
        character.team()
    );

    if character == Character::Merlin {
        let visible = usernames(players, |other| {
            other.is_evil() && !other.holds(Character::Mordred)
        });
        message.push_str("\nEvil Players:\n");
        message.push_str(&visible.join("\n"));
    }

    if character.is_evil() {
        let visible = usernames(players, |other| {
            other.is_evil() && !other.holds(Character::Oberon) && other.username != player.username
        });
        message.push_str("\nOther Evil Players:\n");
        message.push_str(&visible.join("\n"));
    }

    if character == Character::Percival {
        let mut candidates = usernames(players, |other| {
            other.holds(Character::Merlin) || other.holds(Character::Morgana)
        });
        candidates.sort();
        if let [first, second] = candidates.as_slice() {
            message.push_str(&format!("\nMerlin is either {first} or {second}"));
        }
    }

    message
}

/// Reveal messages for every real player in a dealt session.
///
/// Placeholder players are skipped; they have nowhere to receive them.
#[must_use]
pub fn role_reveal_messages(session: &GameSession) -> Vec<(PlayerAddress, String)> {
    let players = session.players();
    players
        .iter()
        .filter(|p| !p.placeholder)
        .map(|p| (p.address(), role_reveal_message(p, players)))
        .collect()
}

fn usernames(players: &[Player], include: impl Fn(&Player) -> bool) -> Vec<&str> {
    players
        .iter()
        .filter(|p| include(p))
        .map(|p| p.username.as_str())
        .collect()
}
