use crate::{
    api,
    session::{HashAlgorithm, PgSessionStore, SessionConfig},
};
use anyhow::Result;
use secrecy::SecretString;
use std::{sync::Arc, time::Duration};
use tracing::info;
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub db_max_connections: u32,
    pub algorithm: HashAlgorithm,
    pub server_salt: SecretString,
    pub session_ttl: Option<Duration>,
    pub store_timeout: Duration,
    pub sweep_interval: Option<Duration>,
    pub max_payload_bytes: usize,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database cannot be reached or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let config = SessionConfig::new(args.algorithm, args.server_salt)
        .with_token_ttl(args.session_ttl)
        .with_store_timeout(args.store_timeout)
        .with_max_payload_bytes(args.max_payload_bytes);

    let store =
        PgSessionStore::connect(&args.dsn, args.db_max_connections, args.store_timeout).await?;

    api::new(args.port, Arc::new(store), config, args.sweep_interval).await
}

fn log_startup_args(args: &Args) {
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        ("dsn", redact_dsn(&args.dsn)),
        ("db_max_connections", args.db_max_connections.to_string()),
        ("hash_algorithm", args.algorithm.to_string()),
        ("server_salt", "set".to_string()),
        ("session_ttl", seconds_or(args.session_ttl, "never")),
        ("store_timeout", format!("{}s", args.store_timeout.as_secs())),
        ("sweep_interval", seconds_or(args.sweep_interval, "disabled")),
        ("max_payload_bytes", args.max_payload_bytes.to_string()),
    ];
    log_entries("Startup configuration", &entries);
}

fn seconds_or(duration: Option<Duration>, fallback: &str) -> String {
    duration.map_or_else(
        || fallback.to_string(),
        |duration| format!("{}s", duration.as_secs()),
    )
}

fn redact_dsn(dsn: &str) -> String {
    match Url::parse(dsn) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("REDACTED"));
            }
            parsed.to_string()
        }
        Err(_) => "invalid-dsn".to_string(),
    }
}

fn log_entries(title: &str, entries: &[(&str, String)]) {
    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!("{}\n\n{title}:", hiscore_banner());
    for (key, value) in entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}

fn hiscore_banner() -> String {
    let short_hash = short_commit(crate::GIT_COMMIT_HASH);
    HISCORE_BANNER.replace(
        "{VERSION}",
        &format!(" - {} - {}", env!("CARGO_PKG_VERSION"), short_hash),
    )
}

fn short_commit(hash: &str) -> String {
    let trimmed = hash.trim();
    if trimmed.len() > 7 {
        trimmed[..7].to_string()
    } else {
        trimmed.to_string()
    }
}

const HISCORE_BANNER: &str = r"
  _____________
 |  1. 999999  |
 |  2. 500000  |   H I S C O R E {VERSION}
 |  3. 000500  |
  -------------";
