//! Session-key lifecycle: credential lookup, token issuance and single-use
//! redemption gating score submission.

pub mod config;
pub mod credentials;
pub mod digest;
pub mod error;
pub mod input;
pub mod issuer;
pub mod memory;
pub mod postgres;
pub mod redeemer;
pub mod scores;
pub mod store;
pub mod sweeper;

pub use self::config::SessionConfig;
pub use self::digest::HashAlgorithm;
pub use self::error::SessionError;
pub use self::issuer::SessionKeyIssuer;
pub use self::memory::{Fault, MemorySessionStore};
pub use self::postgres::PgSessionStore;
pub use self::redeemer::{Accepted, SessionKeyRedeemer};
pub use self::store::{SessionStore, StoreSession};

use chrono::{DateTime, Utc};

/// Store-assigned identity of a registered game credential.
pub type CredentialId = i64;

/// A live, single-use token as persisted at issuance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken {
    pub value: String,
    pub credential_id: CredentialId,
    pub issued_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// An accepted score submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreRecord {
    pub credential_id: CredentialId,
    pub submitted_at: DateTime<Utc>,
    pub payload: String,
}
