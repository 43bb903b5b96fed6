//! Authentication gate.
//!
//! Flow Overview: a request's cookie token is resolved into a [`Session`]
//! (anonymous when missing, unknown or expired). `login` checks credentials
//! against the [`AccountStore`] and returns a new authenticated session with a
//! fresh token; the caller sets the cookie. `logout` destroys the stored record.
//! Sessions go in and come out as values; the gate never mutates the caller's copy.

mod accounts;
mod error;
mod rate_limit;
mod session;
mod store;
mod token;

pub use accounts::{hash_password, hash_password_with, Account, AccountStore, AccountsError, Role};
pub use error::GateError;
pub use rate_limit::{
    NoopRateLimiter, RateLimitDecision, RateLimiter, SlidingWindowRateLimiter,
    DEFAULT_MAX_ATTEMPTS, DEFAULT_WINDOW, RATE_LIMITED_MESSAGE,
};
pub use session::{Session, SessionToken};
pub use store::{MemorySessionStore, SessionStore, SessionStoreError};
pub use token::SessionKey;
pub(crate) use token::generate_secret;

use secrecy::{ExposeSecret, SecretString};
use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};
use tracing::{debug, error, info, instrument, warn};

pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

pub struct Gate {
    accounts: Arc<AccountStore>,
    sessions: Arc<dyn SessionStore>,
    secret: SecretString,
    session_ttl: Duration,
}

impl Gate {
    #[must_use]
    pub fn new(
        accounts: Arc<AccountStore>,
        sessions: Arc<dyn SessionStore>,
        secret: SecretString,
        session_ttl: Duration,
    ) -> Self {
        Self {
            accounts,
            sessions,
            secret,
            session_ttl,
        }
    }

    #[must_use]
    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    #[must_use]
    pub fn account(&self, username: &str) -> Option<&Account> {
        self.accounts.get(username)
    }

    /// Check a username/password pair against the account table. No side effects.
    #[must_use]
    pub fn check_credentials(&self, username: &str, password: &SecretString) -> bool {
        self.accounts.verify(username, password.expose_secret())
    }

    /// Authenticate `session` with the given credentials.
    ///
    /// The argon2 verification runs on the blocking thread pool.
    ///
    /// # Errors
    /// Returns `GateError::InvalidCredentials` when the credentials do not match,
    /// or `GateError::Internal` if the check or the new session cannot be completed.
    #[instrument(skip(self, session, password))]
    pub async fn login(
        &self,
        session: &Session,
        username: &str,
        password: &SecretString,
    ) -> Result<Session, GateError> {
        let accounts = Arc::clone(&self.accounts);
        let candidate = username.to_string();
        let password = SecretString::from(password.expose_secret().to_string());

        let valid = tokio::task::spawn_blocking(move || {
            accounts.verify(&candidate, password.expose_secret())
        })
        .await
        .map_err(|err| GateError::Internal(format!("credential check failed: {err}")))?;

        self.issue_session(session, username, valid, SystemTime::now())
    }

    /// Blocking [`Gate::login`] with an explicit clock.
    ///
    /// # Errors
    /// See [`Gate::login`].
    #[instrument(skip(self, session, password))]
    pub fn login_at(
        &self,
        session: &Session,
        username: &str,
        password: &SecretString,
        now: SystemTime,
    ) -> Result<Session, GateError> {
        let valid = self.check_credentials(username, password);
        self.issue_session(session, username, valid, now)
    }

    fn issue_session(
        &self,
        session: &Session,
        username: &str,
        credentials_valid: bool,
        now: SystemTime,
    ) -> Result<Session, GateError> {
        if !credentials_valid {
            warn!("Invalid credentials");
            return Err(GateError::InvalidCredentials);
        }

        let token = token::generate_session_token()
            .map_err(|err| GateError::Internal(format!("{err:#}")))?;
        let key = token::hash_session_token(&self.secret, &token);
        let authenticated = Session::authenticated(
            SessionToken::new(token),
            username.to_string(),
            now,
            self.session_ttl,
        )
        .ok_or_else(|| {
            GateError::Internal(format!(
                "session ttl of {}s overflows the clock",
                self.session_ttl.as_secs()
            ))
        })?;
        self.sessions.save(key, authenticated.without_token())?;

        // Rotate: the token the client came in with must not stay valid.
        if let Some(previous) = session.token() {
            let previous_key = token::hash_session_token(&self.secret, previous.as_str());
            if let Err(err) = self.sessions.destroy(&previous_key) {
                error!("{}", GateError::SessionDestroyFailure(err));
            }
        }

        info!("Login succeeded");
        Ok(authenticated)
    }

    /// Whether `session` may reach protected content.
    #[must_use]
    pub fn require_auth(&self, session: &Session) -> bool {
        self.require_auth_at(session, SystemTime::now())
    }

    #[must_use]
    pub fn require_auth_at(&self, session: &Session, now: SystemTime) -> bool {
        session.is_authenticated() && !session.is_expired(now)
    }

    /// Resolve a cookie token into a session.
    ///
    /// # Errors
    /// Returns `GateError::Internal` if the session store is unavailable.
    pub fn resolve(&self, token: Option<&str>) -> Result<Session, GateError> {
        self.resolve_at(token, SystemTime::now())
    }

    /// [`Gate::resolve`] with an explicit clock.
    ///
    /// # Errors
    /// See [`Gate::resolve`].
    pub fn resolve_at(&self, token: Option<&str>, now: SystemTime) -> Result<Session, GateError> {
        let Some(token) = token.filter(|token| !token.is_empty()) else {
            return Ok(Session::anonymous(now));
        };

        let key = token::hash_session_token(&self.secret, token);
        match self.sessions.load(&key)? {
            Some(session) if session.is_expired(now) => {
                debug!(?key, "Session expired");
                self.sessions.destroy(&key)?;
                Ok(Session::anonymous(now))
            }
            Some(session) => Ok(session.with_token(SessionToken::new(token.to_string()))),
            None => Ok(Session::anonymous(now)),
        }
    }

    /// Destroy `session`. Store failures are logged, never returned.
    pub fn logout(&self, session: Session) {
        let Some(token) = session.token() else {
            return;
        };

        let key = token::hash_session_token(&self.secret, token.as_str());
        match self.sessions.destroy(&key) {
            Ok(true) => info!(username = session.username(), "Logged out"),
            Ok(false) => debug!(?key, "Logout for unknown session"),
            Err(err) => error!("{}", GateError::SessionDestroyFailure(err)),
        }
    }

    /// Remove expired sessions from the store.
    ///
    /// # Errors
    /// Returns an error if the session store is unavailable.
    pub fn purge_expired(&self) -> Result<usize, GateError> {
        Ok(self.sessions.purge_expired(SystemTime::now())?)
    }
}
