//! The `jwt` session cookie.

use axum::http::header::COOKIE;
use axum::http::{HeaderMap, HeaderValue};
use chrono::{DateTime, Duration, Utc};
use cookie::time::{self, OffsetDateTime};
use cookie::{Cookie, SameSite};

use crate::app::errors::ApiError;

pub const SESSION_COOKIE: &str = "jwt";

/// Value written over the session cookie on logout.
pub const LOGGED_OUT: &str = "loggedout";

fn build(value: &str, now: DateTime<Utc>, lifetime: Duration, secure: bool) -> Result<HeaderValue, ApiError> {
    let expires = OffsetDateTime::from_unix_timestamp((now + lifetime).timestamp())
        .map_err(|e| ApiError::Internal(e.into()))?;

    let cookie = Cookie::build((SESSION_COOKIE, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(time::Duration::seconds(lifetime.num_seconds()))
        .expires(expires)
        .build();

    HeaderValue::from_str(&cookie.encoded().to_string()).map_err(|e| ApiError::Internal(e.into()))
}

pub fn session(token: &str, now: DateTime<Utc>, lifetime: Duration, secure: bool) -> Result<HeaderValue, ApiError> {
    build(token, now, lifetime, secure)
}

/// Overwrites the session with a sentinel that expires in ten seconds.
pub fn logged_out(now: DateTime<Utc>) -> Result<HeaderValue, ApiError> {
    build(LOGGED_OUT, now, Duration::seconds(10), false)
}

/// Decoded value of the first cookie called `name`. Malformed pairs are skipped.
pub fn read(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(Cookie::split_parse_encoded)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_string())
}
