pub mod logging;

use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        BoolishValueParser, PossibleValuesParser,
    },
    Arg, ArgAction, ColorChoice, Command,
};

pub const CMD_HASH_PASSWORD: &str = "hash-password";

/// One year.
const MAX_SESSION_TTL_SECONDS: u64 = 365 * 24 * 60 * 60;

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let command = Command::new("storygate")
        .about("Session-gated story site server")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("3000")
                .env("STORYGATE_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("accounts")
                .short('a')
                .long("accounts")
                .help("Path to the accounts JSON file (argon2 PHC hashes)")
                .env("STORYGATE_ACCOUNTS"),
        )
        .arg(
            Arg::new("session-secret")
                .long("session-secret")
                .help("Secret mixed into session keys, required in production (min 32 bytes)")
                .env("STORYGATE_SESSION_SECRET")
                .hide_env_values(true),
        )
        .arg(
            Arg::new("environment")
                .short('e')
                .long("environment")
                .help("Deployment environment, production marks cookies Secure")
                .default_value("development")
                .env("STORYGATE_ENV")
                .value_parser(PossibleValuesParser::new(["development", "production"])),
        )
        .arg(
            Arg::new("public-dir")
                .long("public-dir")
                .help("Directory holding index.html and the story assets")
                .default_value("public")
                .env("STORYGATE_PUBLIC_DIR"),
        )
        .arg(
            Arg::new("session-ttl-seconds")
                .long("session-ttl-seconds")
                .help("Session lifetime in seconds")
                .default_value("86400")
                .env("STORYGATE_SESSION_TTL_SECONDS")
                .value_parser(clap::value_parser!(u64).range(60..=MAX_SESSION_TTL_SECONDS)),
        )
        .arg(
            Arg::new("login-max-attempts")
                .long("login-max-attempts")
                .help("Login attempts allowed per client address inside the window, 0 disables the limit")
                .default_value("5")
                .env("STORYGATE_LOGIN_MAX_ATTEMPTS")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("login-window-seconds")
                .long("login-window-seconds")
                .help("Rate limit window for login attempts in seconds")
                .default_value("900")
                .env("STORYGATE_LOGIN_WINDOW_SECONDS")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new("trust-proxy-headers")
                .long("trust-proxy-headers")
                .help("Rate limit by X-Forwarded-For/X-Real-IP instead of the peer address (only behind a trusted proxy)")
                .env("STORYGATE_TRUST_PROXY_HEADERS")
                .action(ArgAction::SetTrue)
                .value_parser(BoolishValueParser::new()),
        )
        .subcommand(
            Command::new(CMD_HASH_PASSWORD)
                .about("Read a password from stdin and print its argon2id hash for the accounts file"),
        );

    logging::with_args(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENV_VARS: [&str; 10] = [
        "STORYGATE_PORT",
        "STORYGATE_ACCOUNTS",
        "STORYGATE_SESSION_SECRET",
        "STORYGATE_ENV",
        "STORYGATE_PUBLIC_DIR",
        "STORYGATE_SESSION_TTL_SECONDS",
        "STORYGATE_LOGIN_MAX_ATTEMPTS",
        "STORYGATE_LOGIN_WINDOW_SECONDS",
        "STORYGATE_TRUST_PROXY_HEADERS",
        "STORYGATE_LOG_LEVEL",
    ];

    fn without_env<F: FnOnce()>(f: F) {
        temp_env::with_vars_unset(ENV_VARS, f);
    }

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "storygate");
        assert_eq!(
            command.get_about().unwrap().to_string(),
            "Session-gated story site server"
        );
        assert_eq!(
            command.get_version().unwrap().to_string(),
            env!("CARGO_PKG_VERSION")
        );
    }

    #[test]
    fn test_defaults() {
        without_env(|| {
            let matches = new().get_matches_from(vec!["storygate"]);
            assert_eq!(matches.get_one::<u16>("port").copied(), Some(3000));
            assert_eq!(
                matches.get_one::<String>("environment").map(String::as_str),
                Some("development")
            );
            assert_eq!(
                matches.get_one::<String>("public-dir").map(String::as_str),
                Some("public")
            );
            assert_eq!(
                matches.get_one::<u64>("session-ttl-seconds").copied(),
                Some(86_400)
            );
            assert_eq!(matches.get_one::<u32>("login-max-attempts").copied(), Some(5));
            assert_eq!(
                matches.get_one::<u64>("login-window-seconds").copied(),
                Some(900)
            );
            assert!(matches.get_one::<String>("accounts").is_none());
            assert!(matches.get_one::<String>("session-secret").is_none());
            assert_eq!(matches.get_one::<bool>("trust-proxy-headers").copied(), Some(false));
        });
    }

    #[test]
    fn test_check_args() {
        without_env(|| {
            let matches = new().get_matches_from(vec![
                "storygate",
                "--port",
                "8080",
                "--accounts",
                "/etc/storygate/accounts.json",
                "--environment",
                "production",
                "--session-secret",
                "0123456789abcdef0123456789abcdef",
            ]);

            assert_eq!(matches.get_one::<u16>("port").copied(), Some(8080));
            assert_eq!(
                matches.get_one::<String>("accounts").map(String::as_str),
                Some("/etc/storygate/accounts.json")
            );
            assert_eq!(
                matches.get_one::<String>("environment").map(String::as_str),
                Some("production")
            );
        });
    }

    #[test]
    fn test_check_env() {
        temp_env::with_vars(
            [
                ("STORYGATE_PORT", Some("443")),
                ("STORYGATE_ACCOUNTS", Some("/srv/accounts.json")),
                ("STORYGATE_ENV", Some("production")),
                ("STORYGATE_SESSION_SECRET", Some("from-env")),
                ("STORYGATE_LOGIN_MAX_ATTEMPTS", Some("0")),
                ("STORYGATE_LOG_LEVEL", Some("info")),
                ("STORYGATE_TRUST_PROXY_HEADERS", Some("yes")),
            ],
            || {
                let matches = new().get_matches_from(vec!["storygate"]);
                assert_eq!(matches.get_one::<u16>("port").copied(), Some(443));
                assert_eq!(
                    matches.get_one::<String>("accounts").map(String::as_str),
                    Some("/srv/accounts.json")
                );
                assert_eq!(
                    matches.get_one::<String>("session-secret").map(String::as_str),
                    Some("from-env")
                );
                assert_eq!(matches.get_one::<u32>("login-max-attempts").copied(), Some(0));
                assert_eq!(matches.get_one::<u8>("verbosity").copied(), Some(2));
                assert_eq!(matches.get_one::<bool>("trust-proxy-headers").copied(), Some(true));
            },
        );
    }

    #[test]
    fn test_rejects_unknown_environment() {
        without_env(|| {
            let result =
                new().try_get_matches_from(vec!["storygate", "--environment", "staging"]);
            assert!(result.is_err());
        });
    }

    #[test]
    fn test_rejects_short_session_ttl() {
        without_env(|| {
            let result =
                new().try_get_matches_from(vec!["storygate", "--session-ttl-seconds", "5"]);
            assert!(result.is_err());
        });
    }

    #[test]
    fn test_session_ttl_is_capped_at_one_year() {
        without_env(|| {
            let max = MAX_SESSION_TTL_SECONDS.to_string();
            let matches = new().get_matches_from(vec!["storygate", "--session-ttl-seconds", &max]);
            assert_eq!(
                matches.get_one::<u64>("session-ttl-seconds").copied(),
                Some(MAX_SESSION_TTL_SECONDS)
            );

            let too_long = (MAX_SESSION_TTL_SECONDS + 1).to_string();
            let result =
                new().try_get_matches_from(vec!["storygate", "--session-ttl-seconds", &too_long]);
            assert!(result.is_err());

            let result = new().try_get_matches_from(vec![
                "storygate",
                "--session-ttl-seconds",
                "18446744073709551615",
            ]);
            assert!(result.is_err());
        });
    }

    #[test]
    fn test_trust_proxy_headers_flag() {
        without_env(|| {
            let matches = new().get_matches_from(vec!["storygate", "--trust-proxy-headers"]);
            assert_eq!(matches.get_one::<bool>("trust-proxy-headers").copied(), Some(true));
        });
    }

    #[test]
    fn test_check_log_level_verbosity() {
        let levels = ["error", "warn", "info", "debug", "trace"];
        for (index, _) in levels.iter().enumerate() {
            without_env(|| {
                let mut args = vec!["storygate".to_string()];

                // Add the appropriate number of "-v" flags based on the index
                if index > 0 {
                    args.push(format!("-{}", "v".repeat(index)));
                }

                let matches = new().get_matches_from(args);
                assert_eq!(
                    matches.get_one::<u8>("verbosity").copied(),
                    Some(u8::try_from(index).unwrap_or(u8::MAX))
                );
            });
        }
    }

    #[test]
    fn test_hash_password_subcommand() {
        without_env(|| {
            let matches = new().get_matches_from(vec!["storygate", "hash-password"]);
            assert_eq!(matches.subcommand_name(), Some(CMD_HASH_PASSWORD));
        });
    }
}
