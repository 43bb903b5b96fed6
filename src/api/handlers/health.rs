use crate::{api::AppState, GIT_COMMIT_HASH};
use axum::{
    body::Body,
    extract::Extension,
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Health {
    pub status: String,
    pub uptime_seconds: u64,
    pub commit: String,
    pub name: String,
    pub version: String,
}

#[utoipa::path(
    get,
    path= "/health",
    responses (
        (status = 200, description = "Server is up", body = Health)
    ),
    tag= "health"
)]
// axum handler for health
pub async fn health(method: Method, state: Extension<Arc<AppState>>) -> impl IntoResponse {
    let health = Health {
        status: "ok".to_string(),
        uptime_seconds: state.uptime_seconds(),
        commit: GIT_COMMIT_HASH.to_string(),
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    let body = if method == Method::GET {
        Json(&health).into_response()
    } else {
        Body::empty().into_response()
    };

    let short_hash = short_hash(&health.commit);

    let headers = format!("{}:{}:{}", health.name, health.version, short_hash)
        .parse::<HeaderValue>()
        .map(|x_app_header_value| {
            debug!("X-App header: {:?}", x_app_header_value);

            let mut headers = HeaderMap::new();

            headers.insert("X-App", x_app_header_value);

            headers
        })
        .map_err(|err| {
            error!("Failed to parse X-App header: {}", err);
        });

    // Empty headers if the value could not be built
    let headers = headers.unwrap_or_else(|()| HeaderMap::new());

    (StatusCode::OK, headers, body)
}

/// First seven characters of the commit, empty when it is shorter.
fn short_hash(commit: &str) -> &str {
    commit.get(..7).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_hash_keeps_seven_characters() {
        assert_eq!(short_hash("0123456789abcdef"), "0123456");
        assert_eq!(short_hash("0123456"), "0123456");
        assert_eq!(short_hash("012345"), "");
    }
}
