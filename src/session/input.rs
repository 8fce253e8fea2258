//! Shape checks for caller-supplied values, run before any store access.

use crate::session::{SessionError, digest::HashAlgorithm};
use regex::Regex;

pub const MAX_CREDENTIAL_KEY_LEN: usize = 255;

fn invalid(reason: &str) -> SessionError {
    SessionError::ValidationError(reason.to_string())
}

/// Credential keys are opaque, but must be present and printable.
///
/// # Errors
/// Returns `ValidationError` for empty, oversized or control-character keys.
pub fn credential_key(key: &str) -> Result<&str, SessionError> {
    if key.is_empty() {
        return Err(invalid("missing game key"));
    }
    if key.len() > MAX_CREDENTIAL_KEY_LEN {
        return Err(invalid("game key too long"));
    }
    if key.chars().any(char::is_control) {
        return Err(invalid("game key contains control characters"));
    }
    Ok(key)
}

/// Tokens must be hex of the configured digest length; returns the lowercase form.
///
/// # Errors
/// Returns `ValidationError` when the token is missing or not a digest of `algorithm`.
pub fn session_token(token: &str, algorithm: HashAlgorithm) -> Result<String, SessionError> {
    if token.is_empty() {
        return Err(invalid("missing session key"));
    }

    let pattern = format!("^[0-9a-fA-F]{{{}}}$", algorithm.hex_len());
    if Regex::new(&pattern).is_ok_and(|re| re.is_match(token)) {
        Ok(token.to_ascii_lowercase())
    } else {
        Err(invalid("malformed session key"))
    }
}

/// # Errors
/// Returns `ValidationError` for empty or oversized payloads.
pub fn payload(data: &str, max_bytes: usize) -> Result<&str, SessionError> {
    if data.is_empty() {
        return Err(invalid("missing data"));
    }
    if data.len() > max_bytes {
        return Err(invalid("data too large"));
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_key_rules() {
        assert_eq!(credential_key("abc123"), Ok("abc123"));
        assert!(credential_key("").is_err());
        assert!(credential_key("a\nb").is_err());
        assert!(credential_key(&"k".repeat(MAX_CREDENTIAL_KEY_LEN + 1)).is_err());
        assert!(credential_key(&"k".repeat(MAX_CREDENTIAL_KEY_LEN)).is_ok());
    }

    #[test]
    fn session_token_is_normalized() {
        let upper = "AB".repeat(64);
        assert_eq!(
            session_token(&upper, HashAlgorithm::Sha512),
            Ok("ab".repeat(64))
        );
    }

    #[test]
    fn session_token_length_must_match_algorithm() {
        let sha256 = "a".repeat(64);
        assert!(session_token(&sha256, HashAlgorithm::Sha256).is_ok());
        assert!(matches!(
            session_token(&sha256, HashAlgorithm::Sha512),
            Err(SessionError::ValidationError(msg)) if msg == "malformed session key"
        ));
    }

    #[test]
    fn session_token_rejects_non_hex() {
        let token = format!("{}g", "a".repeat(63));
        assert!(session_token(&token, HashAlgorithm::Sha256).is_err());
        assert!(matches!(
            session_token("", HashAlgorithm::Sha256),
            Err(SessionError::ValidationError(msg)) if msg == "missing session key"
        ));
    }

    #[test]
    fn payload_rules() {
        assert_eq!(payload("score=500", 16), Ok("score=500"));
        assert!(payload("", 16).is_err());
        assert!(payload("score=5000000000", 8).is_err());
    }
}
