use super::GateResponse;
use crate::api::{
    cookies::{clear_session_cookie, extract_session_token, wants_json},
    AppState,
};
use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap},
    response::{IntoResponse, Json, Redirect, Response},
};
use std::sync::Arc;
use tracing::error;

#[utoipa::path(
    post,
    path = "/logout",
    responses(
        (status = 200, description = "Session cleared", body = GateResponse),
        (status = 303, description = "Session cleared, redirected to /login")
    ),
    tag = "auth"
)]
pub async fn logout(state: Extension<Arc<AppState>>, headers: HeaderMap) -> Response {
    match state.gate().resolve(extract_session_token(&headers).as_deref()) {
        Ok(session) => state.gate().logout(session),
        Err(err) => error!("Failed to resolve session on logout: {err}"),
    }

    // Always clear the cookie, even if the session record was missing.
    let mut response_headers = HeaderMap::new();
    match clear_session_cookie(state.config()) {
        Ok(cookie) => {
            response_headers.insert(SET_COOKIE, cookie);
        }
        Err(err) => error!("Failed to build clear-cookie header: {err}"),
    }

    if wants_json(&headers) {
        (response_headers, Json(GateResponse::ok())).into_response()
    } else {
        (response_headers, Redirect::to("/login")).into_response()
    }
}
