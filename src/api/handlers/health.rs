//! Health probe handlers.
//!
//! - `/live`: process liveness only (no dependency checks)
//! - `/ready`: store-aware readiness for orchestrators
//! - `/health`: store-aware status with detailed JSON payload

use crate::GIT_COMMIT_HASH;
use crate::session::SessionStore;
use axum::{
    body::Body,
    extract::Extension,
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::{Duration, timeout};
use tracing::{debug, error, warn};
use utoipa::ToSchema;

const HEALTH_DB_TIMEOUT_SECONDS: u64 = 2;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Health {
    commit: String,
    name: String,
    version: String,
    database: String,
}

#[utoipa::path(
    get,
    path= "/live",
    responses (
        (status = 200, description = "Process is alive")
    ),
    tag = "health",
)]
/// Report process liveness without checking external dependencies.
pub async fn live() -> impl IntoResponse {
    StatusCode::OK
}

#[utoipa::path(
    get,
    path= "/ready",
    responses (
        (status = 200, description = "Service is ready to receive traffic"),
        (status = 503, description = "Session store is not ready")
    ),
    tag = "health",
)]
/// Report readiness based on store connectivity.
pub async fn ready(Extension(store): Extension<Arc<dyn SessionStore>>) -> impl IntoResponse {
    if probe_store(store.as_ref()).await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

#[utoipa::path(
    get,
    path= "/health",
    responses (
        (status = 200, description = "Session store is healthy", body = Health),
        (status = 503, description = "Session store is unhealthy", body = Health)
    ),
    tag = "health",
)]
/// Detailed health check. `OPTIONS` returns the same status and headers
/// without a body.
pub async fn health(
    method: Method,
    Extension(store): Extension<Arc<dyn SessionStore>>,
) -> impl IntoResponse {
    let db_healthy = probe_store(store.as_ref()).await;

    let health = Health {
        commit: GIT_COMMIT_HASH.to_string(),
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: if db_healthy {
            "ok".to_string()
        } else {
            "error".to_string()
        },
    };

    let body = if method == Method::GET {
        Json(&health).into_response()
    } else {
        Body::empty().into_response()
    };

    let short_hash = if health.commit.len() > 7 {
        &health.commit[0..7]
    } else {
        ""
    };

    let headers = format!("{}:{}:{}", health.name, health.version, short_hash)
        .parse::<HeaderValue>()
        .map(|x_app_header_value| {
            debug!("X-App header: {:?}", x_app_header_value);

            let mut headers = HeaderMap::new();
            headers.insert("X-App", x_app_header_value);
            headers
        })
        .map_err(|err| {
            debug!("Failed to parse X-App header: {}", err);
        })
        .unwrap_or_else(|()| HeaderMap::new());

    if db_healthy {
        (StatusCode::OK, headers, body)
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, headers, body)
    }
}

async fn probe_store(store: &dyn SessionStore) -> bool {
    match timeout(Duration::from_secs(HEALTH_DB_TIMEOUT_SECONDS), store.ping()).await {
        Ok(Ok(())) => true,
        Ok(Err(err)) => {
            error!("Session store probe failed: {err:#}");
            false
        }
        Err(_) => {
            warn!(
                "Session store probe timed out after {}s",
                HEALTH_DB_TIMEOUT_SECONDS
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemorySessionStore;

    #[tokio::test]
    async fn probe_reports_store_state() {
        let store = MemorySessionStore::new();
        assert!(probe_store(&store).await);
        store.set_unavailable(true);
        assert!(!probe_store(&store).await);
    }

    #[test]
    fn health_serializes_fields() -> Result<(), serde_json::Error> {
        let health = Health {
            commit: "abc".to_string(),
            name: "hiscore".to_string(),
            version: "0.1.0".to_string(),
            database: "ok".to_string(),
        };
        let value = serde_json::to_value(health)?;
        assert_eq!(value["database"], "ok");
        assert_eq!(value["name"], "hiscore");
        Ok(())
    }
}
