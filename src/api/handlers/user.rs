use super::error_response;
use crate::{
    api::AppState,
    gate::{GateError, Role, Session},
};
use axum::{
    extract::Extension,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct UserResponse {
    pub username: String,
    pub role: Role,
}

#[utoipa::path(
    get,
    path = "/api/user",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 303, description = "No session, redirected to /login")
    ),
    tag = "auth"
)]
pub async fn user(state: Extension<Arc<AppState>>, session: Extension<Session>) -> Response {
    let account = session
        .username()
        .and_then(|username| state.gate().account(username));

    match account {
        Some(account) => Json(UserResponse {
            username: account.username().to_string(),
            role: account.role(),
        })
        .into_response(),
        None => error_response(
            &GateError::Internal("authenticated session without account".to_string()),
            true,
        ),
    }
}
