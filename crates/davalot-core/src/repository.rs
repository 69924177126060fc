//! Session repository abstraction.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::DomainError;

/// Stored representation of a game session snapshot.
#[derive(Debug, Clone)]
pub struct StoredSession {
    /// Channel the session is bound to.
    pub channel_id: String,
    /// Identifier of this particular game instance.
    pub session_id: Uuid,
    /// Version of the session (number of events applied).
    pub version: i64,
    /// Serialized session state.
    pub payload: serde_json::Value,
    /// Timestamp of the write.
    pub saved_at: chrono::DateTime<chrono::Utc>,
}

/// Repository trait for loading and saving one session per channel.
///
/// Implementations must make `save_session` a compare-and-swap: the write
/// only lands if the currently stored version equals `expected_version`
/// (`0` meaning no session is stored), otherwise it fails with
/// `DomainError::ConcurrencyConflict`.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Load the session currently stored for a channel.
    async fn load_session(&self, channel_id: &str) -> Result<Option<StoredSession>, DomainError>;

    /// Store a session snapshot with optimistic concurrency.
    async fn save_session(
        &self,
        channel_id: &str,
        expected_version: i64,
        session: &StoredSession,
    ) -> Result<(), DomainError>;
}
