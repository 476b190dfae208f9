use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderMap, header};
use axum::middleware::from_fn_with_state;
use axum::routing::MethodRouter;
use url::Url;

use tourbook_auth::Role;

use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::middleware;

pub mod bookings;
pub mod reviews;
pub mod system;
pub mod tours;
pub mod users;
pub mod views;

pub(crate) const ADMINS: &[Role] = &[Role::Admin];

/// Router for everything under `/api/v1`.
pub fn api_router(services: &Arc<AppServices>) -> Router {
    Router::new()
        .nest("/tours", tours::router(services))
        .nest("/users", users::router(services))
        .nest("/reviews", reviews::router(services))
        .nest("/bookings", bookings::router(services))
}

/// Require a logged-in user for every method on `route`.
pub(crate) fn authenticated(route: MethodRouter, services: &Arc<AppServices>) -> MethodRouter {
    route.route_layer(from_fn_with_state(services.clone(), middleware::require_auth))
}

/// Require a logged-in user holding one of `roles`.
pub(crate) fn guarded(
    route: MethodRouter,
    services: &Arc<AppServices>,
    roles: &'static [Role],
) -> MethodRouter {
    // route_layer wraps outward: the role check must end up inside authentication.
    let route = route.route_layer(from_fn_with_state(roles, middleware::restrict_to));
    authenticated(route, services)
}

/// Public origin of the current request, for links in emails and payment
/// redirects.
pub(crate) fn site_base(headers: &HeaderMap) -> Result<Url, ApiError> {
    let header_str = move |name: header::HeaderName| headers.get(name).and_then(|v| v.to_str().ok());
    let scheme = header_str(header::HeaderName::from_static("x-forwarded-proto")).unwrap_or("http");
    let host = header_str(header::HOST).unwrap_or("localhost");

    Url::parse(&format!("{scheme}://{host}/"))
        .map_err(|_| ApiError::bad_request(format!("Invalid host header: {host}")))
}
