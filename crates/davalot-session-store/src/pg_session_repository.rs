//! `PostgreSQL` implementation of the `SessionRepository` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use davalot_core::error::DomainError;
use davalot_core::repository::{SessionRepository, StoredSession};

/// PostgreSQL-backed session repository.
///
/// Saves are a compare-and-swap on the `version` column of `game_sessions`.
#[derive(Debug, Clone)]
pub struct PgSessionRepository {
    pool: PgPool,
}

impl PgSessionRepository {
    /// Creates a new `PgSessionRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn current_version(&self, channel_id: &str) -> Result<i64, DomainError> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT version FROM game_sessions WHERE channel_id = $1")
                .bind(channel_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(database_error)?;
        Ok(row.map_or(0, |(version,)| version))
    }
}

fn database_error(e: sqlx::Error) -> DomainError {
    DomainError::Infrastructure(format!("database error: {e}"))
}

type SessionRow = (String, Uuid, i64, serde_json::Value, DateTime<Utc>);

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn load_session(&self, channel_id: &str) -> Result<Option<StoredSession>, DomainError> {
        let row: Option<SessionRow> = sqlx::query_as(
            "SELECT channel_id, session_id, version, payload, saved_at \
             FROM game_sessions WHERE channel_id = $1",
        )
        .bind(channel_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(row.map(
            |(channel_id, session_id, version, payload, saved_at)| StoredSession {
                channel_id,
                session_id,
                version,
                payload,
                saved_at,
            },
        ))
    }

    async fn save_session(
        &self,
        channel_id: &str,
        expected_version: i64,
        session: &StoredSession,
    ) -> Result<(), DomainError> {
        let result = if expected_version == 0 {
            sqlx::query(
                "INSERT INTO game_sessions (channel_id, session_id, version, payload, saved_at) \
                 VALUES ($1, $2, $3, $4, $5) \
                 ON CONFLICT (channel_id) DO NOTHING",
            )
            .bind(channel_id)
            .bind(session.session_id)
            .bind(session.version)
            .bind(&session.payload)
            .bind(session.saved_at)
            .execute(&self.pool)
            .await
        } else {
            sqlx::query(
                "UPDATE game_sessions \
                 SET session_id = $2, version = $3, payload = $4, saved_at = $5 \
                 WHERE channel_id = $1 AND version = $6",
            )
            .bind(channel_id)
            .bind(session.session_id)
            .bind(session.version)
            .bind(&session.payload)
            .bind(session.saved_at)
            .bind(expected_version)
            .execute(&self.pool)
            .await
        }
        .map_err(database_error)?;

        if result.rows_affected() == 0 {
            let actual = self.current_version(channel_id).await?;
            return Err(DomainError::ConcurrencyConflict {
                channel_id: channel_id.to_owned(),
                expected: expected_version,
                actual,
            });
        }

        debug!(%channel_id, version = session.version, "session saved");
        Ok(())
    }
}
