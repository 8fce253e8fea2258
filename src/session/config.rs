use crate::session::digest::HashAlgorithm;
use chrono::{DateTime, TimeDelta, Utc};
use secrecy::SecretString;
use std::time::Duration;

pub const DEFAULT_TOKEN_TTL_SECONDS: u64 = 3600;
pub const DEFAULT_STORE_TIMEOUT_SECONDS: u64 = 5;
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 4096;

/// Process-wide session settings, built once at startup and handed to the
/// issuer and redeemer.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    algorithm: HashAlgorithm,
    server_salt: SecretString,
    token_ttl: Option<Duration>,
    store_timeout: Duration,
    max_payload_bytes: usize,
}

impl SessionConfig {
    #[must_use]
    pub fn new(algorithm: HashAlgorithm, server_salt: SecretString) -> Self {
        Self {
            algorithm,
            server_salt,
            token_ttl: Some(Duration::from_secs(DEFAULT_TOKEN_TTL_SECONDS)),
            store_timeout: Duration::from_secs(DEFAULT_STORE_TIMEOUT_SECONDS),
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }

    /// `None` keeps tokens alive until they are redeemed.
    #[must_use]
    pub fn with_token_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.token_ttl = ttl.filter(|ttl| !ttl.is_zero());
        self
    }

    #[must_use]
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_max_payload_bytes(mut self, max: usize) -> Self {
        self.max_payload_bytes = max;
        self
    }

    #[must_use]
    pub const fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    #[must_use]
    pub const fn server_salt(&self) -> &SecretString {
        &self.server_salt
    }

    #[must_use]
    pub const fn token_ttl(&self) -> Option<Duration> {
        self.token_ttl
    }

    #[must_use]
    pub const fn store_timeout(&self) -> Duration {
        self.store_timeout
    }

    #[must_use]
    pub const fn max_payload_bytes(&self) -> usize {
        self.max_payload_bytes
    }

    /// Expiry for a token issued at `issued_at`, if tokens expire at all.
    #[must_use]
    pub fn expires_at(&self, issued_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let ttl = TimeDelta::from_std(self.token_ttl?).ok()?;
        issued_at.checked_add_signed(ttl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn config() -> SessionConfig {
        SessionConfig::new(HashAlgorithm::Sha512, SecretString::from("salt"))
    }

    #[test]
    fn defaults() {
        let cfg = config();
        assert_eq!(cfg.algorithm(), HashAlgorithm::Sha512);
        assert_eq!(cfg.server_salt().expose_secret(), "salt");
        assert_eq!(
            cfg.token_ttl(),
            Some(Duration::from_secs(DEFAULT_TOKEN_TTL_SECONDS))
        );
        assert_eq!(
            cfg.store_timeout(),
            Duration::from_secs(DEFAULT_STORE_TIMEOUT_SECONDS)
        );
        assert_eq!(cfg.max_payload_bytes(), DEFAULT_MAX_PAYLOAD_BYTES);
    }

    #[test]
    fn zero_ttl_disables_expiry() {
        let cfg = config().with_token_ttl(Some(Duration::ZERO));
        assert_eq!(cfg.token_ttl(), None);
        assert_eq!(cfg.expires_at(Utc::now()), None);
    }

    #[test]
    fn expires_at_adds_ttl() {
        let cfg = config().with_token_ttl(Some(Duration::from_secs(60)));
        let now = Utc::now();
        assert_eq!(cfg.expires_at(now), Some(now + TimeDelta::seconds(60)));
    }

    #[test]
    fn debug_does_not_leak_salt() {
        let cfg = config();
        assert!(!format!("{cfg:?}").contains("\"salt\""));
    }
}
