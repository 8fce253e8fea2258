//! PostgreSQL session store.
//!
//! Schema lives in `db/sql/01_hiscore.sql`. Each [`StoreSession`] owns one
//! pooled connection, returned to the pool when the session is dropped.

use crate::session::{
    CredentialId, ScoreRecord, SessionToken,
    store::{ConsumedToken, SessionStore, StoreFuture, StoreSession},
};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Row, pool::PoolConnection, postgres::PgPoolOptions};
use std::time::Duration;
use tracing::{Instrument, info_span};

const FIND_CREDENTIAL: &str = "SELECT id FROM credentials WHERE key = $1";
const INSERT_TOKEN: &str =
    "INSERT INTO session_tokens (token, credential_id, issued_at, expires_at) VALUES ($1, $2, $3, $4)";
// The conditional delete is the single authority on who consumed a token.
const CONSUME_TOKEN: &str = "DELETE FROM session_tokens WHERE token = $1 AND credential_id = $2 RETURNING credential_id, issued_at, expires_at";
const INSERT_SCORE: &str =
    "INSERT INTO score_records (credential_id, submitted_at, payload) VALUES ($1, $2, $3)";
const REAP_EXPIRED: &str = "DELETE FROM session_tokens WHERE expires_at <= $1";

macro_rules! db_span {
    ($operation:expr, $statement:expr) => {
        info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = $operation,
            db.statement = $statement
        )
    };
}

#[derive(Debug, Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a pool sized for short request flows.
    ///
    /// # Errors
    /// Returns an error if the database cannot be reached.
    pub async fn connect(dsn: &str, max_connections: u32, acquire_timeout: Duration) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .max_lifetime(Duration::from_secs(60 * 2))
            .test_before_acquire(true)
            .connect(dsn)
            .await
            .context("Failed to connect to database")?;

        Ok(Self::new(pool))
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl SessionStore for PgSessionStore {
    fn open(&self) -> StoreFuture<'_, Box<dyn StoreSession>> {
        Box::pin(async move {
            let conn = self
                .pool
                .acquire()
                .instrument(info_span!(
                    "db.acquire",
                    db.system = "postgresql",
                    db.operation = "ACQUIRE"
                ))
                .await
                .context("failed to acquire database connection")?;
            let session: Box<dyn StoreSession> = Box::new(PgSession { conn });
            Ok(session)
        })
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query("SELECT 1")
                .execute(&self.pool)
                .instrument(db_span!("SELECT", "SELECT 1"))
                .await
                .context("database ping failed")?;
            Ok(())
        })
    }

    fn reap_expired(&self, now: DateTime<Utc>) -> StoreFuture<'_, u64> {
        Box::pin(async move {
            let result = sqlx::query(REAP_EXPIRED)
                .bind(now)
                .execute(&self.pool)
                .instrument(db_span!("DELETE", REAP_EXPIRED))
                .await
                .context("failed to delete expired session tokens")?;
            Ok(result.rows_affected())
        })
    }
}

struct PgSession {
    conn: PoolConnection<Postgres>,
}

impl StoreSession for PgSession {
    fn find_credential<'a>(&'a mut self, key: &'a str) -> StoreFuture<'a, Option<CredentialId>> {
        Box::pin(async move {
            let row = sqlx::query(FIND_CREDENTIAL)
                .bind(key)
                .fetch_optional(&mut *self.conn)
                .instrument(db_span!("SELECT", FIND_CREDENTIAL))
                .await
                .context("failed to look up credential")?;

            row.map(|row| row.try_get::<i64, _>("id"))
                .transpose()
                .context("failed to read credential id")
        })
    }

    fn insert_token<'a>(&'a mut self, token: &'a SessionToken) -> StoreFuture<'a, u64> {
        Box::pin(async move {
            let result = sqlx::query(INSERT_TOKEN)
                .bind(&token.value)
                .bind(token.credential_id)
                .bind(token.issued_at)
                .bind(token.expires_at)
                .execute(&mut *self.conn)
                .instrument(db_span!("INSERT", INSERT_TOKEN))
                .await
                .context("failed to persist session token")?;
            Ok(result.rows_affected())
        })
    }

    fn consume_token<'a>(
        &'a mut self,
        token: &'a str,
        credential_id: CredentialId,
    ) -> StoreFuture<'a, Option<ConsumedToken>> {
        Box::pin(async move {
            let row = sqlx::query(CONSUME_TOKEN)
                .bind(token)
                .bind(credential_id)
                .fetch_optional(&mut *self.conn)
                .instrument(db_span!("DELETE", CONSUME_TOKEN))
                .await
                .context("failed to consume session token")?;

            let Some(row) = row else {
                return Ok(None);
            };

            Ok(Some(ConsumedToken {
                credential_id: row
                    .try_get("credential_id")
                    .context("failed to read credential id")?,
                issued_at: row.try_get("issued_at").context("failed to read issued_at")?,
                expires_at: row
                    .try_get("expires_at")
                    .context("failed to read expires_at")?,
            }))
        })
    }

    fn insert_score<'a>(&'a mut self, record: &'a ScoreRecord) -> StoreFuture<'a, u64> {
        Box::pin(async move {
            let result = sqlx::query(INSERT_SCORE)
                .bind(record.credential_id)
                .bind(record.submitted_at)
                .bind(&record.payload)
                .execute(&mut *self.conn)
                .instrument(db_span!("INSERT", INSERT_SCORE))
                .await
                .context("failed to persist score record")?;
            Ok(result.rows_affected())
        })
    }
}
