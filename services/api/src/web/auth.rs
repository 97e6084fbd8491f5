//! services/api/src/web/auth.rs
//!
//! Finds the auth session token a reconnecting client presents, either as the
//! `token` query parameter or as a `session` cookie.

use axum::http::{header, HeaderMap};

/// Name of the cookie carrying the auth session token.
pub const SESSION_COOKIE: &str = "session";

/// Extracts the session token from the `Cookie` header, if present.
pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    let cookie_header = headers.get(header::COOKIE).and_then(|v| v.to_str().ok())?;
    cookie_header
        .split(';')
        .find_map(|c| {
            let (name, value) = c.trim().split_once('=')?;
            (name == SESSION_COOKIE).then_some(value)
        })
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// The token to resume with: an explicit query parameter wins over the cookie.
pub fn resume_token(query_token: Option<String>, headers: &HeaderMap) -> Option<String> {
    query_token
        .filter(|token| !token.trim().is_empty())
        .or_else(|| session_cookie(headers))
}
