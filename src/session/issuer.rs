use crate::session::{
    SessionConfig, SessionError, SessionToken, credentials, digest, input,
    store::{SessionStore, bounded},
};
use chrono::Utc;
use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing::{debug, error, instrument};

/// Exchanges a registered credential key for a fresh single-use token.
#[derive(Clone)]
pub struct SessionKeyIssuer {
    store: Arc<dyn SessionStore>,
    config: Arc<SessionConfig>,
}

impl SessionKeyIssuer {
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>, config: Arc<SessionConfig>) -> Self {
        Self { store, config }
    }

    /// Issue a new session token for `credential_key`.
    ///
    /// The store session opened here is released on every return path.
    ///
    /// # Errors
    /// `ValidationError` for a malformed key, `NotFound` for an unknown key and
    /// `StoreUnavailable` when the token cannot be derived or persisted.
    #[instrument(skip_all)]
    pub async fn issue(&self, credential_key: &str) -> Result<String, SessionError> {
        let credential_key = input::credential_key(credential_key)?;
        let limit = self.config.store_timeout();

        let mut session = bounded(limit, "open", self.store.open()).await?;
        let credential_id = credentials::validate(session.as_mut(), credential_key, limit).await?;

        let value = digest::new_token(
            self.config.algorithm(),
            credential_key,
            self.config.server_salt().expose_secret(),
        )
        .map_err(|err| {
            error!("Failed to derive session token: {err:#}");
            SessionError::StoreUnavailable
        })?;

        let issued_at = Utc::now();
        let token = SessionToken {
            value,
            credential_id,
            issued_at,
            expires_at: self.config.expires_at(issued_at),
        };

        let inserted = bounded(limit, "token insert", session.insert_token(&token)).await?;
        if inserted == 0 {
            error!("Session token insert reported no rows for credential {credential_id}");
            return Err(SessionError::StoreUnavailable);
        }

        debug!("Issued session token for credential {credential_id}");

        Ok(token.value)
    }
}
