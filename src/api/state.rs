//! Shared server state and deployment configuration.

use crate::gate::{Gate, RateLimiter};
use std::{fmt, path::PathBuf, str::FromStr, sync::Arc, time::Instant};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(self) -> bool {
        self == Self::Production
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!("unknown environment: {other}")),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    environment: Environment,
    public_dir: PathBuf,
    trust_proxy_headers: bool,
}

impl AppConfig {
    #[must_use]
    pub fn new(public_dir: PathBuf) -> Self {
        Self {
            environment: Environment::default(),
            public_dir,
            trust_proxy_headers: false,
        }
    }

    /// Take the client address from `X-Forwarded-For`/`X-Real-IP`. Only safe
    /// behind a reverse proxy that overwrites those headers.
    #[must_use]
    pub fn with_trust_proxy_headers(mut self, trust: bool) -> Self {
        self.trust_proxy_headers = trust;
        self
    }

    #[must_use]
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    #[must_use]
    pub fn environment(&self) -> Environment {
        self.environment
    }

    #[must_use]
    pub fn trust_proxy_headers(&self) -> bool {
        self.trust_proxy_headers
    }

    #[must_use]
    pub fn public_dir(&self) -> &PathBuf {
        &self.public_dir
    }

    /// Only mark cookies secure when the site is served over HTTPS.
    #[must_use]
    pub fn session_cookie_secure(&self) -> bool {
        self.environment.is_production()
    }
}

pub struct AppState {
    gate: Gate,
    limiter: Arc<dyn RateLimiter>,
    config: AppConfig,
    started_at: Instant,
}

impl AppState {
    #[must_use]
    pub fn new(gate: Gate, limiter: Arc<dyn RateLimiter>, config: AppConfig) -> Self {
        Self {
            gate,
            limiter,
            config,
            started_at: Instant::now(),
        }
    }

    #[must_use]
    pub fn gate(&self) -> &Gate {
        &self.gate
    }

    #[must_use]
    pub fn limiter(&self) -> &dyn RateLimiter {
        self.limiter.as_ref()
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[must_use]
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
