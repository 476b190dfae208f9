use std::collections::{HashMap, VecDeque};
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::Json;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::middleware::Next;
use axum::response::{Html, IntoResponse, Response};
use serde_json::json;
use tracing::{error, warn};

use tourbook_auth::{JwtValidator, Role, User, authorize};

use crate::app::cookies;
use crate::app::errors::{ApiError, ErrorReport, status_word};
use crate::app::html;
use crate::app::services::AppServices;
use crate::context::{CurrentUser, Viewer};

const NOT_LOGGED_IN: &str = "You are not logged in! Please log in to get access.";
const USER_GONE: &str = "The user belonging to this token no longer exists.";
const PASSWORD_CHANGED: &str = "User recently changed password! Please log in again.";
const GENERIC_MESSAGE: &str = "Something went very wrong!";

// ─────────────────────────────────────────────────────────────────────────────
// Authentication
// ─────────────────────────────────────────────────────────────────────────────

/// Bearer header first, then the session cookie.
fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    bearer.or_else(|| cookies::read(headers, cookies::SESSION_COOKIE).filter(|t| !t.is_empty()))
}

/// Resolve a token to a live user whose password has not changed since the
/// token was issued.
pub async fn authenticate(services: &AppServices, token: &str) -> Result<User, ApiError> {
    let claims = services.tokens.validate(token)?;

    let user = services
        .users
        .find_active(claims.sub)
        .await?
        .ok_or_else(|| ApiError::unauthorized(USER_GONE))?;

    if user.changed_password_after(&claims) {
        return Err(ApiError::unauthorized(PASSWORD_CHANGED));
    }
    Ok(user)
}

pub async fn require_auth(
    State(services): State<Arc<AppServices>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token =
        extract_token(req.headers()).ok_or_else(|| ApiError::unauthorized(NOT_LOGGED_IN))?;

    let user = authenticate(&services, &token).await?;
    req.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(req).await)
}

/// Like [`require_auth`], but any failure just leaves the request anonymous.
pub async fn optional_auth(
    State(services): State<Arc<AppServices>>,
    mut req: Request,
    next: Next,
) -> Response {
    let viewer = match extract_token(req.headers()) {
        Some(token) => authenticate(&services, &token).await.ok(),
        None => None,
    };
    req.extensions_mut().insert(Viewer(viewer));
    next.run(req).await
}

/// Must run inside [`require_auth`].
pub async fn restrict_to(
    State(allowed): State<&'static [Role]>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let role = req
        .extensions()
        .get::<CurrentUser>()
        .map(CurrentUser::role)
        .ok_or_else(|| ApiError::unauthorized(NOT_LOGGED_IN))?;

    authorize(role, allowed)?;
    Ok(next.run(req).await)
}

// ─────────────────────────────────────────────────────────────────────────────
// Rate limiting
// ─────────────────────────────────────────────────────────────────────────────

/// Sliding-window request counter per client address.
#[derive(Debug)]
pub struct RateLimiter {
    limit: u32,
    window: Duration,
    hits: Mutex<HashMap<Option<IpAddr>, VecDeque<Instant>>>,
}

impl RateLimiter {
    const SWEEP_THRESHOLD: usize = 10_000;

    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            hits: Mutex::new(HashMap::new()),
        }
    }

    pub fn per_minute(limit: u32) -> Self {
        Self::new(limit, Duration::from_secs(60))
    }

    /// Record a request at `now`; `false` when the client is over its limit.
    pub fn check(&self, client: Option<IpAddr>, now: Instant) -> bool {
        let mut hits = self.hits.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        if hits.len() > Self::SWEEP_THRESHOLD {
            let window = self.window;
            hits.retain(|_, q| q.back().is_some_and(|t| now.duration_since(*t) < window));
        }

        let queue = hits.entry(client).or_default();
        while queue
            .front()
            .is_some_and(|t| now.duration_since(*t) >= self.window)
        {
            queue.pop_front();
        }

        if queue.len() >= self.limit as usize {
            return false;
        }
        queue.push_back(now);
        true
    }
}

pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let client = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    if !limiter.check(client, Instant::now()) {
        warn!(client = ?client, "rate limit exceeded");
        return Err(ApiError::new(
            StatusCode::TOO_MANY_REQUESTS,
            "Too many requests from this IP, please try again in a minute.",
        ));
    }
    Ok(next.run(req).await)
}

// ─────────────────────────────────────────────────────────────────────────────
// Error rendering
// ─────────────────────────────────────────────────────────────────────────────

/// Render [`ApiError`] responses for their audience.
///
/// API paths get JSON (with the error detail as `stack` in development);
/// everything else gets an HTML error page. In production unexpected errors
/// collapse to a generic 500.
pub async fn render_errors(
    State(services): State<Arc<AppServices>>,
    req: Request,
    next: Next,
) -> Response {
    let is_api = req.uri().path().starts_with("/api");
    let response = next.run(req).await;

    let Some(report) = response.extensions().get::<ErrorReport>().cloned() else {
        return response;
    };

    if !report.operational {
        error!(status = %report.status, detail = %report.detail, "unexpected error");
    }

    let production = services.config.environment.is_production();
    let (status, message) = if production && !report.operational {
        (StatusCode::INTERNAL_SERVER_ERROR, GENERIC_MESSAGE.to_string())
    } else {
        (report.status, report.message.clone())
    };

    if is_api {
        let mut body = json!({ "status": status_word(status), "message": message });
        if !production {
            body["stack"] = json!(report.detail);
        }
        (status, Json(body)).into_response()
    } else {
        (status, Html(html::error_page(&message, None))).into_response()
    }
}
