//! Store seam shared by the Postgres backend and the in-process backend.
//!
//! A flow opens one [`StoreSession`] and drops it on every exit path; the
//! backend releases whatever it holds (a pooled connection for Postgres) on
//! drop.

use crate::session::{CredentialId, ScoreRecord, SessionError, SessionToken};
use chrono::{DateTime, Utc};
use std::{future::Future, pin::Pin, time::Duration};
use tokio::time::timeout;
use tracing::{error, warn};

pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = anyhow::Result<T>> + Send + 'a>>;

/// Row removed by a successful conditional delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumedToken {
    pub credential_id: CredentialId,
    pub issued_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl ConsumedToken {
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

pub trait SessionStore: Send + Sync {
    /// Acquire a store session for one request flow.
    fn open(&self) -> StoreFuture<'_, Box<dyn StoreSession>>;

    /// Cheap connectivity probe used by health checks.
    fn ping(&self) -> StoreFuture<'_, ()>;

    /// Delete every token that expired at or before `now`, returning the count.
    fn reap_expired(&self, now: DateTime<Utc>) -> StoreFuture<'_, u64>;
}

pub trait StoreSession: Send {
    fn find_credential<'a>(&'a mut self, key: &'a str) -> StoreFuture<'a, Option<CredentialId>>;

    /// Returns the number of inserted rows.
    fn insert_token<'a>(&'a mut self, token: &'a SessionToken) -> StoreFuture<'a, u64>;

    /// Atomically delete the token if it belongs to `credential_id`.
    ///
    /// `Some` is returned to exactly one caller per token; expired rows are
    /// deleted and returned as well so the caller can reject them.
    fn consume_token<'a>(
        &'a mut self,
        token: &'a str,
        credential_id: CredentialId,
    ) -> StoreFuture<'a, Option<ConsumedToken>>;

    /// Returns the number of inserted rows.
    fn insert_score<'a>(&'a mut self, record: &'a ScoreRecord) -> StoreFuture<'a, u64>;
}

/// Run a store call under `limit`, mapping errors and expiry to `StoreUnavailable`.
///
/// # Errors
/// Returns `StoreUnavailable` if the call fails or does not finish in time.
pub async fn bounded<T, F>(limit: Duration, operation: &str, call: F) -> Result<T, SessionError>
where
    F: Future<Output = anyhow::Result<T>>,
{
    match timeout(limit, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => {
            error!("Store {operation} failed: {err:#}");
            Err(SessionError::StoreUnavailable)
        }
        Err(_) => {
            warn!("Store {operation} timed out after {:?}", limit);
            Err(SessionError::StoreUnavailable)
        }
    }
}
