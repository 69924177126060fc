//! Notifier used by the HTTP server.

use async_trait::async_trait;
use davalot_core::error::DomainError;
use davalot_core::notifier::{Notifier, PlayerAddress};
use tracing::info;

/// Writes outbound messages to the log instead of a chat platform.
///
/// Stands in for a platform client until one is wired in; players can read
/// their reveals from the server log in local games.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify_player(&self, player: &PlayerAddress, text: &str) -> Result<(), DomainError> {
        info!(
            username = %player.username,
            user_id = %player.user_id,
            text,
            "direct message"
        );
        Ok(())
    }

    async fn notify_channel(&self, channel_id: &str, text: &str) -> Result<(), DomainError> {
        info!(%channel_id, text, "channel message");
        Ok(())
    }
}
