pub mod health;
pub mod session_data;
pub mod session_key;

use crate::session::SessionError;
use axum::http::StatusCode;

/// Map a flow outcome to the HTTP status callers see.
///
/// 4xx means the input was rejected, 503 means the caller may retry.
pub(crate) fn error_response(err: &SessionError) -> (StatusCode, String) {
    match err {
        SessionError::ValidationError(reason) => (StatusCode::BAD_REQUEST, reason.clone()),
        SessionError::NotFound => (StatusCode::UNAUTHORIZED, "Invalid game key".to_string()),
        SessionError::InvalidToken => (StatusCode::FORBIDDEN, "Invalid session key".to_string()),
        SessionError::StoreUnavailable => (
            StatusCode::SERVICE_UNAVAILABLE,
            "Service temporarily unavailable".to_string(),
        ),
    }
}
