use crate::cli::{
    actions::{Action, server::Args},
    commands::{self, session},
};
use crate::session::HashAlgorithm;
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::time::Duration;

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches
        .get_one::<u16>(commands::ARG_PORT)
        .copied()
        .unwrap_or(7050);
    let dsn = matches
        .get_one::<String>(commands::ARG_DSN)
        .cloned()
        .context("missing required argument: --dsn")?;
    let db_max_connections = matches
        .get_one::<u32>(commands::ARG_DB_MAX_CONNECTIONS)
        .copied()
        .unwrap_or(5);

    let algorithm = matches
        .get_one::<HashAlgorithm>(session::ARG_HASH_ALGORITHM)
        .copied()
        .unwrap_or_default();
    let server_salt = matches
        .get_one::<String>(session::ARG_SERVER_SALT)
        .cloned()
        .map(SecretString::from)
        .context("missing required argument: --server-salt")?;

    let seconds = |name: &str| matches.get_one::<u64>(name).copied().unwrap_or(0);

    let session_ttl = non_zero(seconds(session::ARG_SESSION_TTL));
    let sweep_interval = non_zero(seconds(session::ARG_SWEEP_INTERVAL));
    let store_timeout = Duration::from_secs(seconds(session::ARG_STORE_TIMEOUT).max(1));

    let max_payload_bytes = matches
        .get_one::<u32>(session::ARG_MAX_PAYLOAD_BYTES)
        .copied()
        .context("missing argument: --max-payload-bytes")?;
    let max_payload_bytes =
        usize::try_from(max_payload_bytes).context("--max-payload-bytes does not fit in memory")?;

    Ok(Action::Server(Args {
        port,
        dsn,
        db_max_connections,
        algorithm,
        server_salt,
        session_ttl,
        store_timeout,
        sweep_interval,
        max_payload_bytes,
    }))
}

// 0 disables the feature
fn non_zero(seconds: u64) -> Option<Duration> {
    (seconds > 0).then(|| Duration::from_secs(seconds))
}
