//! Test notifiers: mock `Notifier` implementations for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use davalot_core::error::DomainError;
use davalot_core::notifier::{Notifier, PlayerAddress};

/// A notifier that records every message it is asked to deliver.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    player_messages: Mutex<Vec<(PlayerAddress, String)>>,
    channel_messages: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    /// Create an empty recording notifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all direct messages sent to players.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn player_messages(&self) -> Vec<(PlayerAddress, String)> {
        self.player_messages.lock().unwrap().clone()
    }

    /// Returns a snapshot of all messages posted to channels.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn channel_messages(&self) -> Vec<(String, String)> {
        self.channel_messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify_player(&self, player: &PlayerAddress, text: &str) -> Result<(), DomainError> {
        self.player_messages
            .lock()
            .unwrap()
            .push((player.clone(), text.to_owned()));
        Ok(())
    }

    async fn notify_channel(&self, channel_id: &str, text: &str) -> Result<(), DomainError> {
        self.channel_messages
            .lock()
            .unwrap()
            .push((channel_id.to_owned(), text.to_owned()));
        Ok(())
    }
}

/// A notifier whose deliveries always fail.
#[derive(Debug)]
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn notify_player(&self, _player: &PlayerAddress, _text: &str) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("chat platform unavailable".into()))
    }

    async fn notify_channel(&self, _channel_id: &str, _text: &str) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("chat platform unavailable".into()))
    }
}
