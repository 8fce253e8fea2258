//! # Hiscore
//!
//! `hiscore` gates game-score submission behind short-lived, single-use
//! **session keys**. A game first trades its long-lived registration key for a
//! session key, then presents that session key exactly once together with a
//! score payload.
//!
//! ## Lifecycle
//!
//! 1. `GET /get-session-key?game-key=...` validates the game key and returns
//!    `hex(digest(game_key || server_salt || random_salt))`. The digest and the
//!    issuing credential id are stored in `session_tokens`.
//! 2. `GET /send-session-data?game-key=...&session-key=...&data=...` consumes
//!    the session key with one conditional `DELETE ... RETURNING`. Only the
//!    request that receives the deleted row records the payload in
//!    `score_records`; every concurrent or later attempt is rejected.
//!
//! Tokens may carry an expiry. Expired tokens are rejected on presentation
//! and removed by a background sweep.
//!
//! The schema lives in `db/sql/01_hiscore.sql`. Game keys are provisioned
//! out-of-band.

pub mod api;
pub mod cli;
pub mod session;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

#[cfg(test)]
mod tests {
    use anyhow::{Context, Result, ensure};
    use std::fs;
    use std::path::{Path, PathBuf};

    // Normalize SQL to avoid brittle formatting checks in schema tests.
    fn canonicalize_sql(sql: &str) -> String {
        sql.chars()
            .filter(|ch| !ch.is_whitespace())
            .map(|ch| ch.to_ascii_lowercase())
            .collect()
    }

    fn canonical_sql(path: &Path) -> Result<String> {
        let sql = fs::read_to_string(path)
            .with_context(|| format!("Failed to read SQL file at {}", path.display()))?;
        Ok(canonicalize_sql(&sql))
    }

    fn assert_contains(path: &Path, canonical: &str, needle: &str) -> Result<()> {
        ensure!(
            canonical.contains(needle),
            "Expected {needle} in {}",
            path.display()
        );
        Ok(())
    }

    fn schema_path() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("db/sql/01_hiscore.sql")
    }

    #[test]
    fn schema_defines_all_relations() -> Result<()> {
        let path = schema_path();
        let canonical = canonical_sql(&path)?;
        assert_contains(&path, &canonical, "createtableifnotexistscredentials(")?;
        assert_contains(&path, &canonical, "createtableifnotexistssession_tokens(")?;
        assert_contains(&path, &canonical, "createtableifnotexistsscore_records(")
    }

    #[test]
    fn schema_keys_tokens_and_credentials() -> Result<()> {
        let path = schema_path();
        let canonical = canonical_sql(&path)?;
        // Token value is the primary key, so the conditional delete hits one row at most.
        assert_contains(&path, &canonical, "tokentextprimarykey")?;
        assert_contains(&path, &canonical, "keytextnotnullunique")?;
        assert_contains(&path, &canonical, "expires_attimestamptz,")
    }
}
