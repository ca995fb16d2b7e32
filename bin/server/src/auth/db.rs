//! Postgres-backed revocation registry.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hearthside_core::{SessionError, Uid};
use hearthside_session::RevocationStore;
use rootcause::Report;
use sqlx::PgPool;

/// Revocation instants shared by every server instance.
pub struct PgRevocationStore {
    pool: PgPool,
}

impl PgRevocationStore {
    /// Creates a new revocation store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn database_error(e: sqlx::Error) -> SessionError {
    SessionError::transport(format!("revocation registry error: {e}"))
}

#[async_trait]
impl RevocationStore for PgRevocationStore {
    async fn revoke(&self, uid: &Uid, at: DateTime<Utc>) -> Result<(), Report<SessionError>> {
        sqlx::query(
            r#"
            INSERT INTO session_revocations (uid, valid_after)
            VALUES ($1, $2)
            ON CONFLICT (uid) DO UPDATE
            SET valid_after = GREATEST(session_revocations.valid_after, EXCLUDED.valid_after)
            "#,
        )
        .bind(uid.as_str())
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(())
    }

    async fn valid_after(&self, uid: &Uid) -> Result<Option<DateTime<Utc>>, Report<SessionError>> {
        let row: Option<(DateTime<Utc>,)> = sqlx::query_as(
            r#"
            SELECT valid_after
            FROM session_revocations
            WHERE uid = $1
            "#,
        )
        .bind(uid.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(row.map(|(valid_after,)| valid_after))
    }
}
