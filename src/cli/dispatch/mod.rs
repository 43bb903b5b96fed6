//! Map validated CLI matches to the action the binary runs.

use crate::api::Environment;
use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::CMD_HASH_PASSWORD;
use crate::gate::{DEFAULT_MAX_ATTEMPTS, DEFAULT_SESSION_TTL, DEFAULT_WINDOW};
use anyhow::{anyhow, Context, Result};
use secrecy::SecretString;
use std::{path::PathBuf, time::Duration};

const MIN_SECRET_BYTES: usize = 32;

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    if matches.subcommand_name() == Some(CMD_HASH_PASSWORD) {
        return Ok(Action::HashPassword);
    }

    let port = matches.get_one::<u16>("port").copied().unwrap_or(3000);

    let accounts = matches
        .get_one::<String>("accounts")
        .map(PathBuf::from)
        .context("missing required argument: --accounts")?;

    let environment = matches
        .get_one::<String>("environment")
        .map_or(Ok(Environment::Development), |value| value.parse())
        .map_err(|err: String| anyhow!(err))?;

    let session_secret = matches.get_one::<String>("session-secret").cloned();
    if environment.is_production() {
        match &session_secret {
            None => {
                return Err(anyhow!(
                    "missing required argument: --session-secret (required in production)"
                ))
            }
            Some(secret) if secret.len() < MIN_SECRET_BYTES => {
                return Err(anyhow!(
                    "--session-secret must be at least {MIN_SECRET_BYTES} bytes in production"
                ))
            }
            Some(_) => {}
        }
    }

    let public_dir = matches
        .get_one::<String>("public-dir")
        .map_or_else(|| PathBuf::from("public"), PathBuf::from);

    let session_ttl = matches
        .get_one::<u64>("session-ttl-seconds")
        .map_or(DEFAULT_SESSION_TTL, |seconds| Duration::from_secs(*seconds));

    let login_max_attempts = matches
        .get_one::<u32>("login-max-attempts")
        .copied()
        .unwrap_or(DEFAULT_MAX_ATTEMPTS);

    let login_window = matches
        .get_one::<u64>("login-window-seconds")
        .map_or(DEFAULT_WINDOW, |seconds| Duration::from_secs(*seconds));

    let trust_proxy_headers = matches.get_flag("trust-proxy-headers");

    Ok(Action::Server(Args {
        port,
        accounts,
        session_secret: session_secret.map(SecretString::from),
        environment,
        public_dir,
        session_ttl,
        login_max_attempts,
        login_window,
        trust_proxy_headers,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    const ENV_VARS: [&str; 8] = [
        "STORYGATE_ACCOUNTS",
        "STORYGATE_SESSION_SECRET",
        "STORYGATE_ENV",
        "STORYGATE_PORT",
        "STORYGATE_SESSION_TTL_SECONDS",
        "STORYGATE_LOGIN_MAX_ATTEMPTS",
        "STORYGATE_LOGIN_WINDOW_SECONDS",
        "STORYGATE_TRUST_PROXY_HEADERS",
    ];

    fn dispatch(args: &[&str]) -> Result<Action> {
        let matches = crate::cli::commands::new().get_matches_from(args);
        handler(&matches)
    }

    #[test]
    fn accounts_required_for_server() {
        temp_env::with_vars_unset(ENV_VARS, || {
            let result = dispatch(&["storygate"]);
            assert!(result.is_err());
            if let Err(err) = result {
                assert!(err.to_string().contains("missing required argument: --accounts"));
            }
        });
    }

    #[test]
    fn development_allows_missing_secret() {
        temp_env::with_vars_unset(ENV_VARS, || {
            let action = dispatch(&["storygate", "--accounts", "accounts.json"]).unwrap();
            let Action::Server(args) = action else {
                panic!("expected server action");
            };
            assert_eq!(args.port, 3000);
            assert_eq!(args.accounts, PathBuf::from("accounts.json"));
            assert_eq!(args.environment, Environment::Development);
            assert!(args.session_secret.is_none());
            assert_eq!(args.session_ttl, DEFAULT_SESSION_TTL);
            assert_eq!(args.login_max_attempts, DEFAULT_MAX_ATTEMPTS);
            assert_eq!(args.login_window, DEFAULT_WINDOW);
            assert!(!args.trust_proxy_headers);
        });
    }

    #[test]
    fn production_requires_long_secret() {
        temp_env::with_vars_unset(ENV_VARS, || {
            let missing = dispatch(&["storygate", "-a", "a.json", "-e", "production"]);
            assert!(missing
                .err()
                .is_some_and(|err| err.to_string().contains("--session-secret")));

            let short = dispatch(&[
                "storygate",
                "-a",
                "a.json",
                "-e",
                "production",
                "--session-secret",
                "short",
            ]);
            assert!(short
                .err()
                .is_some_and(|err| err.to_string().contains("at least 32 bytes")));
        });
    }

    #[test]
    fn production_with_secret_from_env() {
        temp_env::with_vars(
            [
                ("STORYGATE_ACCOUNTS", Some("/srv/accounts.json")),
                ("STORYGATE_ENV", Some("production")),
                (
                    "STORYGATE_SESSION_SECRET",
                    Some("0123456789abcdef0123456789abcdef"),
                ),
                ("STORYGATE_PORT", Some("8443")),
            ],
            || {
                let Action::Server(args) = dispatch(&["storygate"]).unwrap() else {
                    panic!("expected server action");
                };
                assert_eq!(args.port, 8443);
                assert_eq!(args.environment, Environment::Production);
                assert_eq!(
                    args.session_secret.as_ref().map(|s| s.expose_secret().to_string()),
                    Some("0123456789abcdef0123456789abcdef".to_string())
                );
            },
        );
    }

    #[test]
    fn hash_password_needs_no_accounts() {
        temp_env::with_vars_unset(ENV_VARS, || {
            let action = dispatch(&["storygate", "hash-password"]).unwrap();
            assert!(matches!(action, Action::HashPassword));
        });
    }
}
