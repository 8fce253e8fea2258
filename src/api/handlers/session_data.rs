use crate::api::handlers::error_response;
use crate::session::SessionKeyRedeemer;
use axum::{
    extract::rejection::QueryRejection,
    extract::{Extension, Query},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::{debug, error, instrument};
use utoipa::IntoParams;

#[derive(IntoParams, Debug, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
#[into_params(parameter_in = Query)]
pub struct SessionDataArgs {
    /// Registered game key
    #[serde(default)]
    game_key: String,
    /// Session key returned by `/get-session-key`
    #[serde(default)]
    session_key: String,
    /// Opaque score payload
    #[serde(default)]
    data: String,
}

#[utoipa::path(
    get,
    path= "/send-session-data",
    params(SessionDataArgs),
    responses (
        (status = 202, description = "Score accepted, session key consumed"),
        (status = 400, description = "Missing or malformed parameter", body = String),
        (status = 401, description = "Unknown game key", body = String),
        (status = 403, description = "Session key unknown, expired or already used", body = String),
        (status = 503, description = "Session store unavailable", body = String)
    ),
    tag = "session",
)]
#[instrument(skip(redeemer, query))]
pub async fn session_data(
    Extension(redeemer): Extension<SessionKeyRedeemer>,
    query: Result<Query<SessionDataArgs>, QueryRejection>,
) -> Result<StatusCode, (StatusCode, String)> {
    let args = match query {
        Ok(Query(args)) => args,
        Err(rejection) => {
            error!("Failed to parse query parameters: {rejection}");
            return Err((StatusCode::BAD_REQUEST, "Invalid query string".to_string()));
        }
    };

    debug!("Logging session data");

    redeemer
        .redeem(&args.game_key, &args.session_key, &args.data)
        .await
        .map_err(|err| error_response(&err))?;

    Ok(StatusCode::ACCEPTED)
}
