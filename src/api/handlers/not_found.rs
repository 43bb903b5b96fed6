use super::error_response;
use crate::{
    api::{
        cookies::wants_json,
        templates::{self, NotFoundTemplate},
    },
    gate::GateError,
};
use axum::{
    http::{HeaderMap, StatusCode, Uri},
    response::Response,
};
use tracing::debug;

/// Fallback for authenticated requests that match neither a route nor a file.
pub async fn not_found(headers: HeaderMap, uri: Uri) -> Response {
    debug!(path = %uri.path(), "Not found");
    if wants_json(&headers) {
        return error_response(&GateError::NotFound, true);
    }
    templates::render(
        StatusCode::NOT_FOUND,
        &NotFoundTemplate {
            path: uri.path().to_string(),
        },
    )
}
