use crate::{
    api::{self, AppConfig, AppState, Environment},
    cli::telemetry,
    gate::{
        generate_secret, AccountStore, Gate, MemorySessionStore, NoopRateLimiter, RateLimiter,
        SlidingWindowRateLimiter,
    },
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::{path::PathBuf, sync::Arc, time::Duration};
use tracing::{info, warn};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub accounts: PathBuf,
    pub session_secret: Option<SecretString>,
    pub environment: Environment,
    pub public_dir: PathBuf,
    pub session_ttl: Duration,
    pub login_max_attempts: u32,
    pub login_window: Duration,
    pub trust_proxy_headers: bool,
}

/// Handle the server action
/// # Errors
/// Returns an error if the accounts cannot be loaded or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let port = args.port;
    let state = build_state(args)?;

    let result = api::new(port, Arc::new(state)).await;

    telemetry::shutdown_tracer();

    result
}

/// Load accounts and wire the gate, rate limiter and config into [`AppState`].
///
/// # Errors
/// Returns an error if the accounts file is invalid or no secret can be produced.
pub fn build_state(args: Args) -> Result<AppState> {
    let accounts = AccountStore::load(&args.accounts)
        .with_context(|| format!("Failed to load accounts from {}", args.accounts.display()))?;
    info!(accounts = accounts.len(), "Loaded accounts");

    let secret = match args.session_secret {
        Some(secret) => secret,
        None => {
            warn!("No session secret configured, generated an ephemeral one; sessions will not survive a restart");
            generate_secret().context("Failed to generate session secret")?
        }
    };

    if !args.public_dir.is_dir() {
        warn!("Public directory {} does not exist", args.public_dir.display());
    }

    let gate = Gate::new(
        Arc::new(accounts),
        Arc::new(MemorySessionStore::new()),
        secret,
        args.session_ttl,
    );

    let limiter: Arc<dyn RateLimiter> = if args.login_max_attempts == 0 {
        warn!("Login rate limiting disabled");
        Arc::new(NoopRateLimiter)
    } else {
        Arc::new(SlidingWindowRateLimiter::new(
            args.login_max_attempts,
            args.login_window,
        ))
    };

    if args.trust_proxy_headers {
        info!("Rate limiting by X-Forwarded-For/X-Real-IP");
    }

    let config = AppConfig::new(args.public_dir)
        .with_environment(args.environment)
        .with_trust_proxy_headers(args.trust_proxy_headers);
    info!(
        environment = %config.environment(),
        session_ttl_seconds = args.session_ttl.as_secs(),
        "Server configured"
    );

    Ok(AppState::new(gate, limiter, config))
}
