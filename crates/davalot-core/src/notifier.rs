//! Outbound notification abstraction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Address of a player on the chat platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerAddress {
    /// Display username.
    pub username: String,
    /// Platform user identifier used for direct messages.
    pub user_id: String,
}

/// Delivers messages to players and channels.
///
/// Injected into command handlers; the engine never holds a process-wide
/// client.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends a private message to a single player.
    async fn notify_player(&self, player: &PlayerAddress, text: &str) -> Result<(), DomainError>;

    /// Posts a message to a channel.
    async fn notify_channel(&self, channel_id: &str, text: &str) -> Result<(), DomainError>;
}
