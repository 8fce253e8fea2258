use crate::api::handlers::error_response;
use crate::session::SessionKeyIssuer;
use axum::{
    Json,
    extract::rejection::QueryRejection,
    extract::{Extension, Query},
    http::{HeaderMap, HeaderValue, StatusCode, header::CACHE_CONTROL},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};
use utoipa::{IntoParams, ToSchema};

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SessionKey {
    session_key: String,
}

#[derive(IntoParams, Debug, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
#[into_params(parameter_in = Query)]
pub struct SessionKeyArgs {
    /// Registered game key
    #[serde(default)]
    game_key: String,
}

type SessionKeyResponse = Result<(StatusCode, HeaderMap, Json<SessionKey>), (StatusCode, String)>;

#[utoipa::path(
    get,
    path= "/get-session-key",
    params(SessionKeyArgs),
    responses (
        (status = 200, description = "Return a single-use session key", body = SessionKey),
        (status = 400, description = "Missing or malformed game key", body = String),
        (status = 401, description = "Unknown game key", body = String),
        (status = 503, description = "Session store unavailable", body = String)
    ),
    tag = "session",
)]
#[instrument(skip(issuer, query))]
pub async fn session_key(
    Extension(issuer): Extension<SessionKeyIssuer>,
    query: Result<Query<SessionKeyArgs>, QueryRejection>,
) -> SessionKeyResponse {
    let args = parse_args(query)?;

    debug!("Generating session key");

    let session_key = issuer
        .issue(&args.game_key)
        .await
        .map_err(|err| error_response(&err))?;

    let mut headers = HeaderMap::new();
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    Ok((StatusCode::OK, headers, Json(SessionKey { session_key })))
}

fn parse_args(
    query: Result<Query<SessionKeyArgs>, QueryRejection>,
) -> Result<SessionKeyArgs, (StatusCode, String)> {
    match query {
        Ok(Query(args)) => Ok(args),
        Err(rejection) => {
            error!("Failed to parse query parameters: {rejection}");
            Err((StatusCode::BAD_REQUEST, "Invalid query string".to_string()))
        }
    }
}
