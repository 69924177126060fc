//! Test repositories: mock `SessionRepository` implementations for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use davalot_core::error::DomainError;
use davalot_core::repository::{SessionRepository, StoredSession};

/// A session repository that behaves like a real compare-and-swap store and
/// records every successful `save_session` call.
#[derive(Debug)]
pub struct RecordingSessionRepository {
    current: Mutex<Option<StoredSession>>,
    saved: Mutex<Vec<(String, i64, StoredSession)>>,
}

impl RecordingSessionRepository {
    /// Create a new recording repository seeded with `initial`.
    #[must_use]
    pub fn new(initial: Option<StoredSession>) -> Self {
        Self {
            current: Mutex::new(initial),
            saved: Mutex::new(Vec::new()),
        }
    }

    /// Returns a snapshot of all sessions that were saved, with the expected
    /// version each save was made against.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn saved_sessions(&self) -> Vec<(String, i64, StoredSession)> {
        self.saved.lock().unwrap().clone()
    }

    /// Returns the session currently held.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn current(&self) -> Option<StoredSession> {
        self.current.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionRepository for RecordingSessionRepository {
    async fn load_session(&self, _channel_id: &str) -> Result<Option<StoredSession>, DomainError> {
        Ok(self.current.lock().unwrap().clone())
    }

    async fn save_session(
        &self,
        channel_id: &str,
        expected_version: i64,
        session: &StoredSession,
    ) -> Result<(), DomainError> {
        let mut current = self.current.lock().unwrap();
        let actual = current.as_ref().map_or(0, |s| s.version);
        if actual != expected_version {
            return Err(DomainError::ConcurrencyConflict {
                channel_id: channel_id.to_owned(),
                expected: expected_version,
                actual,
            });
        }
        *current = Some(session.clone());
        self.saved
            .lock()
            .unwrap()
            .push((channel_id.to_owned(), expected_version, session.clone()));
        Ok(())
    }
}

/// A session repository that never holds a session and silently accepts
/// saves. Useful for "session not found" scenarios and lobby creation.
#[derive(Debug)]
pub struct EmptySessionRepository;

#[async_trait]
impl SessionRepository for EmptySessionRepository {
    async fn load_session(&self, _channel_id: &str) -> Result<Option<StoredSession>, DomainError> {
        Ok(None)
    }

    async fn save_session(
        &self,
        _channel_id: &str,
        _expected_version: i64,
        _session: &StoredSession,
    ) -> Result<(), DomainError> {
        Ok(())
    }
}

/// A session repository that always returns an infrastructure error. Useful
/// for testing error-handling paths.
#[derive(Debug)]
pub struct FailingSessionRepository;

#[async_trait]
impl SessionRepository for FailingSessionRepository {
    async fn load_session(&self, _channel_id: &str) -> Result<Option<StoredSession>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn save_session(
        &self,
        _channel_id: &str,
        _expected_version: i64,
        _session: &StoredSession,
    ) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}

/// A session repository that reports a concurrency conflict for the first
/// `conflicts` saves, simulating writers racing on the same channel, then
/// behaves like [`RecordingSessionRepository`].
#[derive(Debug)]
pub struct ConflictingSessionRepository {
    inner: RecordingSessionRepository,
    remaining_conflicts: Mutex<usize>,
    load_count: Mutex<usize>,
}

impl ConflictingSessionRepository {
    /// Create a repository seeded with `initial` that rejects the first
    /// `conflicts` saves.
    #[must_use]
    pub fn new(initial: Option<StoredSession>, conflicts: usize) -> Self {
        Self {
            inner: RecordingSessionRepository::new(initial),
            remaining_conflicts: Mutex::new(conflicts),
            load_count: Mutex::new(0),
        }
    }

    /// Number of `load_session` calls observed.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn load_count(&self) -> usize {
        *self.load_count.lock().unwrap()
    }

    /// Returns the sessions that were eventually saved.
    pub fn saved_sessions(&self) -> Vec<(String, i64, StoredSession)> {
        self.inner.saved_sessions()
    }
}

#[async_trait]
impl SessionRepository for ConflictingSessionRepository {
    async fn load_session(&self, channel_id: &str) -> Result<Option<StoredSession>, DomainError> {
        *self.load_count.lock().unwrap() += 1;
        self.inner.load_session(channel_id).await
    }

    async fn save_session(
        &self,
        channel_id: &str,
        expected_version: i64,
        session: &StoredSession,
    ) -> Result<(), DomainError> {
        {
            let mut remaining = self.remaining_conflicts.lock().unwrap();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(DomainError::ConcurrencyConflict {
                    channel_id: channel_id.to_owned(),
                    expected: expected_version,
                    actual: expected_version + 1,
                });
            }
        }
        self.inner
            .save_session(channel_id, expected_version, session)
            .await
    }
}
