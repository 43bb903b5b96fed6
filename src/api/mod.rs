//! HTTP surface: router, layers and server lifecycle.

use crate::api::handlers::{health, login, logout, not_found, root, user};
use anyhow::Result;
use axum::{
    body::Body,
    extract::MatchedPath,
    handler::HandlerWithoutStateExt,
    http::{
        header::{REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS},
        HeaderName, HeaderValue, Request,
    },
    middleware::from_fn,
    response::Response,
    routing::get,
    Extension, Router,
};
use std::{any::Any, net::SocketAddr, sync::Arc, time::Duration};
use tokio::{net::TcpListener, sync::watch};
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::PropagateRequestIdLayer,
    services::ServeDir,
    set_header::{SetRequestHeaderLayer, SetResponseHeaderLayer},
    trace::TraceLayer,
};
use tracing::{debug, error, info, info_span, Span};
use ulid::Ulid;

pub(crate) mod cookies;
pub mod handlers;
mod middleware;
mod openapi;
mod state;
pub(crate) mod templates;

pub use cookies::SESSION_COOKIE_NAME;
pub use openapi::openapi;
pub use state::{AppConfig, AppState, Environment};

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Build the application router.
///
/// Public routes are `/login`, `/logout` and `/health`; everything else,
/// including static files from the public directory, sits behind the session
/// middleware.
pub fn router(state: Arc<AppState>) -> Router {
    let public_files = ServeDir::new(state.config().public_dir())
        .not_found_service(not_found::not_found.into_service());

    let protected = Router::new()
        .route("/", get(root::root))
        .route("/api/user", get(user::user))
        .fallback_service(public_files)
        .layer(from_fn(middleware::require_session));

    Router::new()
        .route("/login", get(login::login_page).post(login::login))
        .route("/logout", get(logout::logout).post(logout::logout))
        .route("/health", get(health::health).options(health::health))
        .merge(protected)
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
                .layer(SetResponseHeaderLayer::overriding(
                    X_CONTENT_TYPE_OPTIONS,
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    X_FRAME_OPTIONS,
                    HeaderValue::from_static("DENY"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    REFERRER_POLICY,
                    HeaderValue::from_static("same-origin"),
                ))
                .layer(CatchPanicLayer::custom(handle_panic))
                .layer(Extension(state)),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, state: Arc<AppState>) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let sweeper = tokio::spawn(sweep_expired(state.clone(), shutdown_rx));

    let app = router(state);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown_signal().await;
        info!("Gracefully shutdown");
        let _ = shutdown_tx.send(true);
    })
    .await?;

    if let Err(err) = sweeper.await {
        error!("Session sweeper failed: {err}");
    }

    Ok(())
}

/// Periodically drop expired sessions and stale rate-limit buckets.
async fn sweep_expired(state: Arc<AppState>, mut shutdown: watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(SWEEP_INTERVAL);
    // The first tick completes immediately.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match state.gate().purge_expired() {
                    Ok(0) => {}
                    Ok(purged) => debug!(purged, "Purged expired sessions"),
                    Err(err) => error!("Failed to purge sessions: {err}"),
                }
                state.limiter().prune();
            }
            _ = shutdown.changed() => break,
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl-c: {err}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!("Failed to listen for SIGTERM: {err}");
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
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!("Handler panicked: {detail}");
    templates::internal_error()
}
