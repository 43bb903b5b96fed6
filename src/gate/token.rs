//! Session token generation and store key derivation.

use anyhow::{Context, Result};
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use std::fmt;

const TOKEN_BYTES: usize = 32;

/// Digest of a session token. The session store is keyed by this value, never by the raw token.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionKey([u8; 32]);

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // First four bytes are enough to correlate log lines.
        write!(
            f,
            "SessionKey({:02x}{:02x}{:02x}{:02x}..)",
            self.0[0], self.0[1], self.0[2], self.0[3]
        )
    }
}

/// Create a new session token for the auth cookie.
pub(crate) fn generate_session_token() -> Result<String> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate session token")?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

/// Derive the store key for a token, salted with the session secret.
pub(crate) fn hash_session_token(secret: &SecretString, token: &str) -> SessionKey {
    let mut hasher = Sha256::new();
    hasher.update(secret.expose_secret().as_bytes());
    hasher.update([0u8]);
    hasher.update(token.as_bytes());
    SessionKey(hasher.finalize().into())
}

/// Random secret for development runs that did not configure one.
pub(crate) fn generate_secret() -> Result<SecretString> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate session secret")?;
    Ok(SecretString::from(Base64UrlUnpadded::encode_string(&bytes)))
}
