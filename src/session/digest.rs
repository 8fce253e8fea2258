//! Token derivation.
//!
//! A session token is `hex(digest(credential_key || server_salt || random_salt))`.
//! The random salt comes from the OS CSPRNG so two tokens for the same
//! credential never collide in practice.

use anyhow::{Context, Result, anyhow};
use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256, Sha384, Sha512};
use std::{fmt, fmt::Write, str::FromStr};

/// Length of the per-token random salt in bytes.
pub const RANDOM_SALT_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashAlgorithm {
    Sha256,
    Sha384,
    #[default]
    Sha512,
}

impl HashAlgorithm {
    pub const ALL: [Self; 3] = [Self::Sha256, Self::Sha384, Self::Sha512];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
        }
    }

    /// Number of hex characters in a token produced by this algorithm.
    #[must_use]
    pub const fn hex_len(self) -> usize {
        match self {
            Self::Sha256 => 64,
            Self::Sha384 => 96,
            Self::Sha512 => 128,
        }
    }

    fn digest_hex(self, parts: &[&[u8]]) -> String {
        match self {
            Self::Sha256 => hex_digest::<Sha256>(parts),
            Self::Sha384 => hex_digest::<Sha384>(parts),
            Self::Sha512 => hex_digest::<Sha512>(parts),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "").as_str() {
            "sha256" => Ok(Self::Sha256),
            "sha384" => Ok(Self::Sha384),
            "sha512" => Ok(Self::Sha512),
            other => Err(anyhow!("unsupported hash algorithm: {other}")),
        }
    }
}

fn hex_digest<D: Digest>(parts: &[&[u8]]) -> String {
    let mut hasher = D::new();
    for part in parts {
        hasher.update(part);
    }
    let digest = hasher.finalize();

    digest
        .iter()
        .fold(String::with_capacity(digest.len() * 2), |mut acc, byte| {
            let _ = write!(acc, "{byte:02x}");
            acc
        })
}

/// Fill a fresh salt from the OS random source.
///
/// # Errors
/// Returns an error if the OS random source fails.
pub fn random_salt() -> Result<[u8; RANDOM_SALT_LEN]> {
    let mut salt = [0u8; RANDOM_SALT_LEN];
    OsRng
        .try_fill_bytes(&mut salt)
        .context("failed to generate session salt")?;
    Ok(salt)
}

/// Derive a token from already generated salts.
#[must_use]
pub fn derive_token(
    algorithm: HashAlgorithm,
    credential_key: &str,
    server_salt: &str,
    random_salt: &[u8],
) -> String {
    algorithm.digest_hex(&[
        credential_key.as_bytes(),
        server_salt.as_bytes(),
        random_salt,
    ])
}

/// Derive a token with a freshly generated random salt.
///
/// # Errors
/// Returns an error if the OS random source fails.
pub fn new_token(algorithm: HashAlgorithm, credential_key: &str, server_salt: &str) -> Result<String> {
    let salt = random_salt()?;
    Ok(derive_token(algorithm, credential_key, server_salt, &salt))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_algorithm_names() -> Result<()> {
        assert_eq!("sha512".parse::<HashAlgorithm>()?, HashAlgorithm::Sha512);
        assert_eq!("SHA-256".parse::<HashAlgorithm>()?, HashAlgorithm::Sha256);
        assert_eq!(" sha384 ".parse::<HashAlgorithm>()?, HashAlgorithm::Sha384);
        assert!("md5".parse::<HashAlgorithm>().is_err());
        Ok(())
    }

    #[test]
    fn default_is_sha512() {
        assert_eq!(HashAlgorithm::default(), HashAlgorithm::Sha512);
    }

    #[test]
    fn derive_token_matches_known_digest() {
        // sha256("abc") split across the three inputs.
        let token = derive_token(HashAlgorithm::Sha256, "a", "b", b"c");
        assert_eq!(
            token,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn token_length_follows_algorithm() -> Result<()> {
        for algorithm in HashAlgorithm::ALL {
            let token = new_token(algorithm, "abc123", "server-salt")?;
            assert_eq!(token.len(), algorithm.hex_len());
            assert!(token.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        }
        Ok(())
    }

    #[test]
    fn tokens_differ_between_calls() -> Result<()> {
        let first = new_token(HashAlgorithm::Sha512, "abc123", "server-salt")?;
        let second = new_token(HashAlgorithm::Sha512, "abc123", "server-salt")?;
        assert_ne!(first, second);
        Ok(())
    }

    #[test]
    fn server_salt_changes_token() {
        let salt = [7u8; RANDOM_SALT_LEN];
        let first = derive_token(HashAlgorithm::Sha512, "abc123", "one", &salt);
        let second = derive_token(HashAlgorithm::Sha512, "abc123", "two", &salt);
        assert_ne!(first, second);
    }
}
