use std::sync::Arc;

use axum::extract::{Extension, Path};
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use tracing::info;

use tourbook_bookings::CheckoutSessionRequest;
use tourbook_core::{DomainError, TourId};

use crate::app::dto;
use crate::app::errors::ApiError;
use crate::app::factory::{self, Repo, parse_id};
use crate::app::routes::{ADMINS, authenticated, guarded, site_base};
use crate::app::services::AppServices;
use crate::context::CurrentUser;

pub fn router(services: &Arc<AppServices>) -> Router {
    let repo: Repo = Arc::new(services.bookings.clone());

    Router::new()
        .route("/my-bookings", authenticated(get(my_bookings), services))
        .route(
            "/checkout-session/:tour_id",
            authenticated(get(checkout_session), services),
        )
        .route(
            "/",
            guarded(
                factory::get_all(repo.clone()).merge(factory::create_one(repo.clone())),
                services,
                ADMINS,
            ),
        )
        .route(
            "/:id",
            guarded(
                factory::get_one(repo.clone())
                    .merge(factory::update_one(repo.clone()))
                    .merge(factory::delete_one(repo)),
                services,
                ADMINS,
            ),
        )
}

pub async fn my_bookings(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<Value>, ApiError> {
    let bookings = services.bookings.list_for_user(current.id()).await?;
    Ok(Json(dto::list(bookings)))
}

pub async fn checkout_session(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(current): Extension<CurrentUser>,
    Path(tour_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let tour_id = TourId::from(parse_id(&tour_id)?);
    let tour = services
        .tours
        .find_public(tour_id)
        .await?
        .ok_or_else(|| DomainError::not_found("tour"))?;

    let request =
        CheckoutSessionRequest::for_tour(&site_base(&headers)?, &tour, current.id(), &current.0.email);
    let session = services.payments.create_checkout_session(request).await?;
    info!(session_id = %session.id, tour_id = %tour.id, user_id = %current.id(), "checkout session created");

    Ok(Json(json!({ "status": "success", "session": session })))
}
