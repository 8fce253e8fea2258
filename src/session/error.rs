use thiserror::Error;

/// Terminal outcomes of an issue or redeem flow.
///
/// None of these are retried internally; the caller gets a coarse signal and
/// decides whether to try again.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("invalid input: {0}")]
    ValidationError(String),
    #[error("unknown credential key")]
    NotFound,
    #[error("invalid or already consumed session token")]
    InvalidToken,
    #[error("session store unavailable")]
    StoreUnavailable,
}

impl SessionError {
    /// Rejections are final for the presented input, everything else may
    /// succeed on a later attempt.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        !matches!(self, Self::StoreUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_unavailable_is_not_a_rejection() {
        assert!(!SessionError::StoreUnavailable.is_rejection());
        assert!(SessionError::NotFound.is_rejection());
        assert!(SessionError::InvalidToken.is_rejection());
        assert!(SessionError::ValidationError("x".to_string()).is_rejection());
    }

    #[test]
    fn validation_error_carries_reason() {
        let err = SessionError::ValidationError("missing game key".to_string());
        assert_eq!(err.to_string(), "invalid input: missing game key");
    }
}
