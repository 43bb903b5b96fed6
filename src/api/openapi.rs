use super::handlers::{health, login, logout, user, GateResponse};
use crate::gate::Role;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(health::health, login::login, logout::logout, user::user),
    components(schemas(
        health::Health,
        login::LoginRequest,
        GateResponse,
        user::UserResponse,
        Role
    )),
    tags(
        (name = "health", description = "Liveness probe"),
        (name = "auth", description = "Login, logout and the current user")
    )
)]
struct ApiDoc;

/// `OpenAPI` document for the JSON endpoints.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    // Use Cargo.toml metadata for the document info.
    doc.info.title = env!("CARGO_PKG_NAME").to_string();
    doc.info.version = env!("CARGO_PKG_VERSION").to_string();
    doc.info.description = Some(env!("CARGO_PKG_DESCRIPTION").to_string());
    doc
}
