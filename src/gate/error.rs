use super::store::SessionStoreError;

#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("too many login attempts")]
    RateLimited,
    #[error("failed to destroy session: {0}")]
    SessionDestroyFailure(#[source] SessionStoreError),
    #[error("not found")]
    NotFound,
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<SessionStoreError> for GateError {
    fn from(err: SessionStoreError) -> Self {
        Self::Internal(err.to_string())
    }
}
