use crate::session::{
    CredentialId, ScoreRecord, SessionError,
    store::{StoreSession, bounded},
};
use chrono::Utc;
use std::time::Duration;
use tracing::error;

/// Append a score record stamped with the current time.
///
/// The payload is stored as-is.
///
/// # Errors
/// `StoreUnavailable` if the insert fails or reports no inserted row.
pub async fn record(
    session: &mut dyn StoreSession,
    credential_id: CredentialId,
    payload: &str,
    limit: Duration,
) -> Result<ScoreRecord, SessionError> {
    let record = ScoreRecord {
        credential_id,
        submitted_at: Utc::now(),
        payload: payload.to_string(),
    };

    let inserted = bounded(limit, "score insert", session.insert_score(&record)).await?;
    if inserted == 0 {
        error!("Score insert reported no rows for credential {credential_id}");
        return Err(SessionError::StoreUnavailable);
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Fault, MemorySessionStore, SessionStore};
    use anyhow::Result;

    #[tokio::test]
    async fn record_appends() -> Result<()> {
        let store = MemorySessionStore::new();
        let mut session = store.open().await?;

        let first = record(session.as_mut(), 7, "score=500", Duration::from_secs(1)).await;
        let second = record(session.as_mut(), 7, "score=500", Duration::from_secs(1)).await;
        assert!(first.is_ok());
        assert!(second.is_ok());

        let scores = store.scores()?;
        assert_eq!(scores.len(), 2);
        assert!(scores.iter().all(|s| s.credential_id == 7 && s.payload == "score=500"));
        Ok(())
    }

    #[tokio::test]
    async fn record_fails_when_store_is_down() -> Result<()> {
        let store = MemorySessionStore::new();
        let mut session = store.open().await?;
        store.set_unavailable(true);

        let result = record(session.as_mut(), 7, "score=500", Duration::from_secs(1)).await;
        assert_eq!(result, Err(SessionError::StoreUnavailable));
        Ok(())
    }

    #[tokio::test]
    async fn record_without_rows_is_unavailable() -> Result<()> {
        let store = MemorySessionStore::new();
        store.inject(Fault::ScoreInsertNoRows)?;
        let mut session = store.open().await?;

        let result = record(session.as_mut(), 7, "score=500", Duration::from_secs(1)).await;
        assert_eq!(result, Err(SessionError::StoreUnavailable));
        assert!(store.scores()?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn record_insert_error_is_unavailable() -> Result<()> {
        let store = MemorySessionStore::new();
        store.inject(Fault::ScoreInsertFails)?;
        let mut session = store.open().await?;

        let result = record(session.as_mut(), 7, "score=500", Duration::from_secs(1)).await;
        assert_eq!(result, Err(SessionError::StoreUnavailable));
        assert!(store.scores()?.is_empty());
        Ok(())
    }
}
