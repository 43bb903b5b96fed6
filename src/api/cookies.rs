//! Session cookie and request header helpers.

use super::state::AppConfig;
use axum::http::{
    header::{InvalidHeaderValue, ACCEPT, CONTENT_TYPE, COOKIE},
    HeaderMap, HeaderName, HeaderValue,
};
use std::{net::SocketAddr, time::Duration};

pub const SESSION_COOKIE_NAME: &str = "storygate_session";

/// Build an `HttpOnly` cookie carrying the session token.
pub(crate) fn session_cookie(
    config: &AppConfig,
    token: &str,
    ttl: Duration,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let ttl_seconds = ttl.as_secs();
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_seconds}"
    );
    if config.session_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(crate) fn clear_session_cookie(config: &AppConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if config.session_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(crate) fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    for header in headers.get_all(COOKIE) {
        let Ok(value) = header.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            let mut parts = pair.trim().splitn(2, '=');
            let (Some(key), Some(val)) = (parts.next(), parts.next()) else {
                continue;
            };
            let val = val.trim();
            if key.trim() == SESSION_COOKIE_NAME && !val.is_empty() {
                return Some(val.to_string());
            }
        }
    }
    None
}

/// Client address for rate limiting.
///
/// The TCP peer is used unless `trust_proxy` is set, in which case the first
/// `X-Forwarded-For` entry or `X-Real-IP` wins over the peer.
pub(crate) fn extract_client_ip(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_proxy: bool,
) -> Option<String> {
    let peer = peer.map(|addr| addr.ip().to_string());
    if !trust_proxy {
        return peer;
    }

    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if let Some(ip) = forwarded {
        return Some(ip.to_string());
    }
    headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .or(peer)
}

/// True when the client sent JSON or asked for it.
pub(crate) fn wants_json(headers: &HeaderMap) -> bool {
    let is_json = |name: HeaderName| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.contains("application/json"))
    };
    is_json(CONTENT_TYPE) || is_json(ACCEPT)
}
