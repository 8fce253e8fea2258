use crate::session::{
    CredentialId, SessionConfig, SessionError, credentials, input, scores,
    store::{SessionStore, bounded},
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Outcome of a successful redemption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accepted {
    pub credential_id: CredentialId,
    pub submitted_at: DateTime<Utc>,
}

/// Consumes a session token exactly once and records the attached payload.
#[derive(Clone)]
pub struct SessionKeyRedeemer {
    store: Arc<dyn SessionStore>,
    config: Arc<SessionConfig>,
}

impl SessionKeyRedeemer {
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>, config: Arc<SessionConfig>) -> Self {
        Self { store, config }
    }

    /// Redeem `token` issued to `credential_key` and persist `payload`.
    ///
    /// The token is consumed by one conditional delete scoped to the
    /// credential; only the caller that gets the deleted row back may record
    /// a score. Expired tokens are deleted by the same statement and rejected.
    ///
    /// # Errors
    /// `ValidationError` for malformed input, `NotFound` for an unknown
    /// credential, `InvalidToken` when the token is unknown, already consumed,
    /// expired or issued to another credential, and `StoreUnavailable` on any
    /// store failure.
    #[instrument(skip_all)]
    pub async fn redeem(
        &self,
        credential_key: &str,
        token: &str,
        payload: &str,
    ) -> Result<Accepted, SessionError> {
        let credential_key = input::credential_key(credential_key)?;
        let token = input::session_token(token, self.config.algorithm())?;
        let payload = input::payload(payload, self.config.max_payload_bytes())?;
        let limit = self.config.store_timeout();

        let mut session = bounded(limit, "open", self.store.open()).await?;
        let credential_id = credentials::validate(session.as_mut(), credential_key, limit).await?;

        let consumed = bounded(
            limit,
            "token consume",
            session.consume_token(&token, credential_id),
        )
        .await?;

        let Some(consumed) = consumed else {
            debug!("Session token not live for credential {credential_id}");
            return Err(SessionError::InvalidToken);
        };

        if consumed.is_expired(Utc::now()) {
            debug!(
                "Expired session token reaped for credential {credential_id}, issued at {}",
                consumed.issued_at
            );
            return Err(SessionError::InvalidToken);
        }

        let record = scores::record(session.as_mut(), consumed.credential_id, payload, limit).await?;

        info!("Score accepted for credential {}", record.credential_id);

        Ok(Accepted {
            credential_id: record.credential_id,
            submitted_at: record.submitted_at,
        })
    }
}
