//! Askama templates for the login and error pages.

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use tracing::error;

pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid username or password";

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate {
    pub path: String,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate;

/// Render `template` with `status`, falling back to a bare 500 on template errors.
pub(crate) fn render<T: Template>(status: StatusCode, template: &T) -> Response {
    match template.render() {
        Ok(body) => (status, Html(body)).into_response(),
        Err(err) => {
            error!("Failed to render template: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub(crate) fn internal_error() -> Response {
    render(StatusCode::INTERNAL_SERVER_ERROR, &ErrorTemplate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_template_shows_error_banner_only_when_set() {
        let plain = LoginTemplate { error: None }.render().unwrap();
        assert!(plain.contains("<form"));
        assert!(!plain.contains(INVALID_CREDENTIALS_MESSAGE));

        let with_error = LoginTemplate {
            error: Some(INVALID_CREDENTIALS_MESSAGE.to_string()),
        }
        .render()
        .unwrap();
        assert!(with_error.contains(INVALID_CREDENTIALS_MESSAGE));
    }

    #[test]
    fn not_found_template_escapes_path() {
        let page = NotFoundTemplate {
            path: "/<script>".to_string(),
        }
        .render()
        .unwrap();
        assert!(page.contains("&lt;script&gt;"));
    }
}
