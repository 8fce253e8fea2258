use crate::session::HashAlgorithm;
use clap::{Arg, Command, builder::ValueParser};

pub const ARG_HASH_ALGORITHM: &str = "hash-algorithm";
pub const ARG_SERVER_SALT: &str = "server-salt";
pub const ARG_SESSION_TTL: &str = "session-ttl";
pub const ARG_STORE_TIMEOUT: &str = "store-timeout";
pub const ARG_SWEEP_INTERVAL: &str = "sweep-interval";
pub const ARG_MAX_PAYLOAD_BYTES: &str = "max-payload-bytes";

#[must_use]
pub fn validator_hash_algorithm() -> ValueParser {
    ValueParser::from(move |value: &str| -> std::result::Result<HashAlgorithm, String> {
        value.parse::<HashAlgorithm>().map_err(|err| err.to_string())
    })
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_HASH_ALGORITHM)
                .long(ARG_HASH_ALGORITHM)
                .help("Digest used to derive session keys: sha256, sha384, sha512")
                .default_value(HashAlgorithm::default().as_str())
                .env("HISCORE_HASH_ALGORITHM")
                .value_parser(validator_hash_algorithm()),
        )
        .arg(
            Arg::new(ARG_SERVER_SALT)
                .long(ARG_SERVER_SALT)
                .help("Server-wide secret mixed into every session key")
                .env("HISCORE_SERVER_SALT")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL)
                .long(ARG_SESSION_TTL)
                .help("Seconds a session key stays valid, 0 disables expiry")
                .default_value("3600")
                .env("HISCORE_SESSION_TTL")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_STORE_TIMEOUT)
                .long(ARG_STORE_TIMEOUT)
                .help("Seconds allowed for each database call")
                .default_value("5")
                .env("HISCORE_STORE_TIMEOUT")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_SWEEP_INTERVAL)
                .long(ARG_SWEEP_INTERVAL)
                .help("Seconds between expired session key sweeps, 0 disables the sweep")
                .default_value("300")
                .env("HISCORE_SWEEP_INTERVAL")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_MAX_PAYLOAD_BYTES)
                .long(ARG_MAX_PAYLOAD_BYTES)
                .help("Largest accepted score payload in bytes")
                .default_value("4096")
                .env("HISCORE_MAX_PAYLOAD_BYTES")
                .value_parser(clap::value_parser!(u32).range(1..)),
        )
}
