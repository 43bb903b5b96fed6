//! Session values passed into and returned from gate operations.

use std::{
    fmt,
    time::{Duration, SystemTime},
};

/// Opaque session token as carried by the client cookie.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    #[must_use]
    pub fn new(token: String) -> Self {
        Self(token)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(..)")
    }
}

/// A client's session.
///
/// Anonymous sessions have no token and are never persisted. Authenticated
/// sessions carry the token issued at login and expire after the configured TTL.
#[derive(Clone, Debug)]
pub struct Session {
    token: Option<SessionToken>,
    username: Option<String>,
    created_at: SystemTime,
    expires_at: Option<SystemTime>,
}

impl Session {
    #[must_use]
    pub fn anonymous(now: SystemTime) -> Self {
        Self {
            token: None,
            username: None,
            created_at: now,
            expires_at: None,
        }
    }

    pub(crate) fn authenticated(
        token: SessionToken,
        username: String,
        now: SystemTime,
        ttl: Duration,
    ) -> Option<Self> {
        // None when `now + ttl` is not representable.
        let expires_at = now.checked_add(ttl)?;
        Some(Self {
            token: Some(token),
            username: Some(username),
            created_at: now,
            expires_at: Some(expires_at),
        })
    }

    /// Copy suitable for the store: the raw token stays with the client.
    pub(crate) fn without_token(&self) -> Self {
        Self {
            token: None,
            ..self.clone()
        }
    }

    pub(crate) fn with_token(mut self, token: SessionToken) -> Self {
        self.token = Some(token);
        self
    }

    #[must_use]
    pub fn token(&self) -> Option<&SessionToken> {
        self.token.as_ref()
    }

    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.username.is_some()
    }

    #[must_use]
    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    #[must_use]
    pub fn expires_at(&self) -> Option<SystemTime> {
        self.expires_at
    }

    #[must_use]
    pub fn is_expired(&self, now: SystemTime) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    #[test]
    fn anonymous_session_is_not_authenticated() {
        let session = Session::anonymous(SystemTime::now());
        assert!(!session.is_authenticated());
        assert!(session.token().is_none());
        assert!(session.username().is_none());
        assert!(!session.is_expired(SystemTime::now() + Duration::from_secs(86_400 * 365)));
    }

    #[test]
    fn authenticated_session_expires_after_ttl() {
        let now = SystemTime::now();
        let session =
            Session::authenticated(SessionToken::new("t".into()), "demo".into(), now, TTL).unwrap();

        assert!(session.is_authenticated());
        assert_eq!(session.username(), Some("demo"));
        assert_eq!(session.expires_at(), Some(now + TTL));
        assert!(!session.is_expired(now + TTL - Duration::from_secs(1)));
        assert!(session.is_expired(now + TTL));
    }

    #[test]
    fn without_token_keeps_identity() {
        let now = SystemTime::now();
        let session =
            Session::authenticated(SessionToken::new("t".into()), "demo".into(), now, TTL).unwrap();
        let stored = session.without_token();

        assert!(stored.token().is_none());
        assert_eq!(stored.username(), Some("demo"));
        assert_eq!(stored.created_at(), now);
    }

    #[test]
    fn overflowing_ttl_yields_no_session() {
        let session = Session::authenticated(
            SessionToken::new("t".into()),
            "demo".into(),
            SystemTime::now(),
            Duration::from_secs(u64::MAX),
        );
        assert!(session.is_none());
    }

    #[test]
    fn token_debug_is_redacted() {
        let token = SessionToken::new("super-secret".into());
        assert!(!format!("{token:?}").contains("super-secret"));
    }
}
