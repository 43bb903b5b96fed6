use crate::api::{
    templates::{self, NotFoundTemplate},
    AppState,
};
use axum::{
    extract::Extension,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use std::{io::ErrorKind, sync::Arc};
use tracing::{error, warn};

/// Serve the story page, `index.html` from the public directory.
pub async fn root(state: Extension<Arc<AppState>>) -> Response {
    let path = state.config().public_dir().join("index.html");
    match tokio::fs::read_to_string(&path).await {
        Ok(page) => Html(page).into_response(),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            warn!("Story page missing: {}", path.display());
            templates::render(
                StatusCode::NOT_FOUND,
                &NotFoundTemplate {
                    path: "/".to_string(),
                },
            )
        }
        Err(err) => {
            error!("Failed to read {}: {err}", path.display());
            templates::internal_error()
        }
    }
}
