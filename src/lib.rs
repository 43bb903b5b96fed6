//! # Storygate
//!
//! `storygate` serves a static story page behind a username/password login.
//!
//! ## Gate
//!
//! Accounts are loaded once from a JSON file of argon2 PHC hashes and never
//! change while the process runs. A successful login issues an opaque session
//! token in an `HttpOnly` cookie; the server keeps the session record in memory
//! keyed by a secret-salted digest of that token.
//!
//! Sessions are either anonymous or authenticated. The only way in is a
//! successful login; the ways out are logout and expiry.
//!
//! ## Routes
//!
//! `/login`, `/logout` and `/health` are public. Everything else, including the
//! story page at `/` and its assets, requires an authenticated session and
//! redirects to `/login` otherwise.

pub mod api;
pub mod cli;
pub mod gate;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(GIT_COMMIT_HASH.len() >= 7);
    }
}
