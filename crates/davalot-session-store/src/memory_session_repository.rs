//! In-process implementation of the `SessionRepository` trait.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use davalot_core::error::DomainError;
use davalot_core::repository::{SessionRepository, StoredSession};

/// Session repository keeping snapshots in memory, keyed by channel.
///
/// Used when no database is configured; sessions do not survive a restart.
#[derive(Debug, Default)]
pub struct InMemorySessionRepository {
    sessions: Mutex<HashMap<String, StoredSession>>,
}

impl InMemorySessionRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(e: std::sync::PoisonError<T>) -> DomainError {
    DomainError::Infrastructure(format!("session store mutex poisoned: {e}"))
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn load_session(&self, channel_id: &str) -> Result<Option<StoredSession>, DomainError> {
        let sessions = self.sessions.lock().map_err(poisoned)?;
        Ok(sessions.get(channel_id).cloned())
    }

    async fn save_session(
        &self,
        channel_id: &str,
        expected_version: i64,
        session: &StoredSession,
    ) -> Result<(), DomainError> {
        let mut sessions = self.sessions.lock().map_err(poisoned)?;
        let actual = sessions.get(channel_id).map_or(0, |s| s.version);
        if actual != expected_version {
            return Err(DomainError::ConcurrencyConflict {
                channel_id: channel_id.to_owned(),
                expected: expected_version,
                actual,
            });
        }
        sessions.insert(channel_id.to_owned(), session.clone());
        debug!(%channel_id, version = session.version, "session saved");
        Ok(())
    }
}
