use super::{cookies::extract_session_token, templates, AppState};
use axum::{
    extract::{Extension, Request},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tracing::{debug, error};

/// Gate protected routes: authenticated requests continue with the resolved
/// [`Session`](crate::gate::Session) in their extensions, everything else is
/// sent to `/login`.
pub async fn require_session(
    Extension(state): Extension<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = extract_session_token(request.headers());
    let session = match state.gate().resolve(token.as_deref()) {
        Ok(session) => session,
        Err(err) => {
            error!("Failed to resolve session: {err}");
            return templates::internal_error();
        }
    };

    if !state.gate().require_auth(&session) {
        debug!(path = %request.uri().path(), "Anonymous request redirected to login");
        return Redirect::to("/login").into_response();
    }

    request.extensions_mut().insert(session);
    next.run(request).await
}
