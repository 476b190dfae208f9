//! HTTP application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store, repositories and collaborators
//! - `routes/`: HTTP routes + handlers (one file per resource, plus pages)
//! - `factory.rs`: generic CRUD handlers shared by the resources
//! - `dto.rs`: request bodies and response envelopes
//! - `errors.rs`: the error type every handler returns
//! - `html.rs`: server-rendered pages

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, OriginalUri};
use axum::handler::HandlerWithoutStateExt;
use axum::http::{HeaderValue, header};
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::{Extension, Router};
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::{self, RateLimiter};

pub mod cookies;
pub mod dto;
pub mod errors;
pub mod extract;
pub mod factory;
pub mod html;
pub mod routes;
pub mod services;

use errors::ApiError;
use services::AppServices;

async fn not_found(OriginalUri(uri): OriginalUri) -> ApiError {
    ApiError::not_found(format!("Can't find {uri} on this server!"))
}

/// Build the full HTTP router (public entrypoint used by `main.rs` and the
/// black-box tests).
pub fn build_app(services: Arc<AppServices>) -> Router {
    let limiter = Arc::new(RateLimiter::per_minute(services.config.rate_limit_per_minute));
    let body_limit = services.config.body_limit_bytes;

    let api = routes::api_router(&services)
        .layer(from_fn_with_state(limiter, middleware::rate_limit));

    let assets = ServeDir::new(&services.config.public_dir)
        .call_fallback_on_method_not_allowed(true)
        .not_found_service(not_found.into_service());

    Router::new()
        .route("/health", get(routes::system::health))
        .nest("/api/v1", api)
        .merge(routes::views::router(&services))
        .fallback_service(assets)
        .layer(Extension(services.clone()))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(from_fn_with_state(services, middleware::render_errors))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(CorsLayer::permissive())
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::X_CONTENT_TYPE_OPTIONS,
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::X_FRAME_OPTIONS,
                    HeaderValue::from_static("DENY"),
                ))
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::REFERRER_POLICY,
                    HeaderValue::from_static("strict-origin-when-cross-origin"),
                )),
        )
}
