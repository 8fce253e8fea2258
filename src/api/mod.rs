use crate::{
    api::handlers::{health, session_data, session_key},
    session::{SessionConfig, SessionKeyIssuer, SessionKeyRedeemer, SessionStore, sweeper},
};
use anyhow::Result;
use axum::{
    Extension, Router,
    body::Body,
    extract::ConnectInfo,
    http::{HeaderName, HeaderValue, Method, Request},
    routing::options,
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{Span, debug_span, info, warn};
use ulid::Ulid;
use utoipa::openapi::{InfoBuilder, OpenApiBuilder, Tag};
use utoipa_axum::{router::OpenApiRouter, routes};

pub mod handlers;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    // Reuse the same router wiring and only return the generated OpenAPI document.
    let (_router, openapi) = api_router().split_for_parts();
    openapi
}

/// Build the router that also drives the `OpenAPI` document.
///
/// Add new endpoints here via `.routes(routes!(...))` so they are both served
/// and included in the generated `OpenAPI` document.
fn api_router() -> OpenApiRouter {
    let mut router = OpenApiRouter::with_openapi(cargo_openapi())
        .routes(routes!(health::health))
        .routes(routes!(health::live))
        .routes(routes!(health::ready))
        .routes(routes!(session_key::session_key))
        .routes(routes!(session_data::session_data));

    let mut session_tag = Tag::new("session");
    session_tag.description = Some("Single-use session keys for score submission".to_string());
    router.get_openapi_mut().tags = Some(vec![session_tag]);

    router
}

fn cargo_openapi() -> utoipa::openapi::OpenApi {
    let info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(Some(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    OpenApiBuilder::new().info(info).build()
}

/// Wire the request dispatcher: routes, middleware and flow dependencies.
#[must_use]
pub fn app(store: Arc<dyn SessionStore>, config: SessionConfig) -> Router {
    let config = Arc::new(config);
    let issuer = SessionKeyIssuer::new(Arc::clone(&store), Arc::clone(&config));
    let redeemer = SessionKeyRedeemer::new(Arc::clone(&store), config);

    let cors = CorsLayer::new()
        // allow `GET` and `OPTIONS` when accessing the resource
        .allow_methods([Method::GET, Method::OPTIONS])
        // allow requests from any origin
        .allow_origin(Any);

    let (router, _openapi) = api_router().split_for_parts();
    router
        .route("/health", options(health::health))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(issuer))
                .layer(Extension(redeemer))
                .layer(Extension(store)),
        )
}

/// Serve until interrupted.
/// # Errors
/// Returns an error if the listener cannot be bound or the server fails
pub async fn new(
    port: u16,
    store: Arc<dyn SessionStore>,
    config: SessionConfig,
    sweep_every: Option<Duration>,
) -> Result<()> {
    // Stops the sweep on every return path, including bind and serve errors.
    let _sweeper = sweep_every
        .and_then(|every| sweeper::spawn(Arc::clone(&store), every, config.store_timeout()));

    let app = app(store, config);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!("Failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Gracefully shutdown");
}

// span
fn make_span(request: &Request<Body>) -> Span {
    let headers = request.headers();
    let path = request.uri().path();
    let request_id = headers
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| "unknown".to_string(), |info| info.0.to_string());

    debug_span!("http-request", path, remote = %remote, request_id)
}
