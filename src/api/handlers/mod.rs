pub mod health;
pub mod login;
pub mod logout;
pub mod not_found;
pub mod root;
pub mod user;

use super::templates::{self, LoginTemplate};
use crate::gate::{GateError, RATE_LIMITED_MESSAGE};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

/// Result body for the JSON login and logout endpoints.
#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct GateResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl GateResponse {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

/// Turn a gate error into the response a JSON or form client expects.
pub(crate) fn error_response(err: &GateError, json: bool) -> Response {
    match (err, json) {
        (GateError::InvalidCredentials, true) => (
            StatusCode::UNAUTHORIZED,
            Json(GateResponse::failed(templates::INVALID_CREDENTIALS_MESSAGE)),
        )
            .into_response(),
        (GateError::InvalidCredentials, false) => Redirect::to("/login?error=1").into_response(),
        (GateError::RateLimited, true) => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(GateResponse::failed(RATE_LIMITED_MESSAGE)),
        )
            .into_response(),
        (GateError::RateLimited, false) => templates::render(
            StatusCode::TOO_MANY_REQUESTS,
            &LoginTemplate {
                error: Some(RATE_LIMITED_MESSAGE.to_string()),
            },
        ),
        (GateError::NotFound, true) => {
            (StatusCode::NOT_FOUND, Json(GateResponse::failed("Not found"))).into_response()
        }
        (GateError::NotFound, false) => StatusCode::NOT_FOUND.into_response(),
        (GateError::SessionDestroyFailure(_) | GateError::Internal(_), json) => {
            error!("{err}");
            if json {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(GateResponse::failed("Internal server error")),
                )
                    .into_response()
            } else {
                templates::internal_error()
            }
        }
    }
}
