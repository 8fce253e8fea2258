use crate::session::{
    CredentialId, SessionError,
    store::{StoreSession, bounded},
};
use std::time::Duration;
use tracing::debug;

/// Resolve a credential key to its store identity.
///
/// # Errors
/// `NotFound` when no credential matches, `StoreUnavailable` on store failure.
pub async fn validate(
    session: &mut dyn StoreSession,
    credential_key: &str,
    limit: Duration,
) -> Result<CredentialId, SessionError> {
    let found = bounded(
        limit,
        "credential lookup",
        session.find_credential(credential_key),
    )
    .await?;

    found.ok_or_else(|| {
        debug!("Credential key rejected");
        SessionError::NotFound
    })
}
