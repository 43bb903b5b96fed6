//! Login page and credential submission.

use super::{error_response, GateResponse};
use crate::{
    api::{
        cookies::{extract_client_ip, extract_session_token, session_cookie, wants_json},
        templates::{self, LoginTemplate, INVALID_CREDENTIALS_MESSAGE},
        AppState,
    },
    gate::{GateError, RateLimitDecision, Session},
};
use axum::{
    extract::{ConnectInfo, Extension, Form, FromRequest, Query, Request},
    http::{
        header::{CONTENT_TYPE, SET_COOKIE},
        HeaderMap, StatusCode,
    },
    response::{IntoResponse, Json, Redirect, Response},
};
use secrecy::SecretString;
use serde::Deserialize;
use std::{fmt, net::SocketAddr, sync::Arc};
use tracing::{error, warn};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct LoginPageQuery {
    error: Option<String>,
}

/// Render the login form, or skip it when the session is already authenticated.
pub async fn login_page(
    state: Extension<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<LoginPageQuery>,
) -> Response {
    match state.gate().resolve(extract_session_token(&headers).as_deref()) {
        Ok(session) if state.gate().require_auth(&session) => {
            return Redirect::to("/").into_response();
        }
        Ok(_) => {}
        Err(err) => return error_response(&err, false),
    }

    let error = query
        .error
        .is_some_and(|flag| flag == "1")
        .then(|| INVALID_CREDENTIALS_MESSAGE.to_string());

    templates::render(StatusCode::OK, &LoginTemplate { error })
}

#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in, session cookie set", body = GateResponse),
        (status = 400, description = "Malformed request body", body = GateResponse),
        (status = 401, description = "Invalid username or password", body = GateResponse),
        (status = 429, description = "Too many login attempts", body = GateResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    state: Extension<Arc<AppState>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
) -> Response {
    let headers = request.headers().clone();
    let json = wants_json(&headers);

    let client_ip = extract_client_ip(
        &headers,
        connect_info.map(|ConnectInfo(addr)| addr),
        state.config().trust_proxy_headers(),
    );
    if state.limiter().check_ip(client_ip.as_deref()) == RateLimitDecision::Limited {
        warn!(client_ip = client_ip.as_deref().unwrap_or("unknown"), "Login rate limited");
        return error_response(&GateError::RateLimited, json);
    }

    let body = match parse_login_request(request).await {
        Ok(body) => body,
        Err(reason) => {
            warn!("Malformed login request: {reason}");
            return if json {
                (
                    StatusCode::BAD_REQUEST,
                    Json(GateResponse::failed("Username and password are required")),
                )
                    .into_response()
            } else {
                Redirect::to("/login?error=1").into_response()
            };
        }
    };

    let current = match state.gate().resolve(extract_session_token(&headers).as_deref()) {
        Ok(session) => session,
        Err(err) => return error_response(&err, json),
    };

    let password = SecretString::from(body.password);
    match state
        .gate()
        .login(&current, &body.username, &password)
        .await
    {
        Ok(session) => login_succeeded(&state, &session, json),
        Err(err) => error_response(&err, json),
    }
}

fn login_succeeded(state: &AppState, session: &Session, json: bool) -> Response {
    let Some(token) = session.token() else {
        return error_response(
            &GateError::Internal("login returned a session without a token".to_string()),
            json,
        );
    };

    let cookie = match session_cookie(state.config(), token.as_str(), state.gate().session_ttl()) {
        Ok(cookie) => cookie,
        Err(err) => {
            error!("Failed to build session cookie: {err}");
            return templates::internal_error();
        }
    };

    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, cookie);

    if json {
        (StatusCode::OK, headers, Json(GateResponse::ok())).into_response()
    } else {
        (headers, Redirect::to("/")).into_response()
    }
}

async fn parse_login_request(request: Request) -> Result<LoginRequest, String> {
    let is_json = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"));

    if is_json {
        Json::<LoginRequest>::from_request(request, &())
            .await
            .map(|Json(body)| body)
            .map_err(|rejection| rejection.body_text())
    } else {
        Form::<LoginRequest>::from_request(request, &())
            .await
            .map(|Form(body)| body)
            .map_err(|rejection| rejection.body_text())
    }
}
