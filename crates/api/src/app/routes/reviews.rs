use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Extension, Path, Query};
use axum::http::StatusCode;
use axum::routing::{MethodRouter, delete, get, patch, post};
use axum::{Json, Router};
use serde_json::Value;

use tourbook_auth::Role;
use tourbook_core::{DomainError, TourId};
use tourbook_infra::{CrudRepository, scoped_to_tour};
use tourbook_query::ListQuery;
use tourbook_reviews::Review;

use crate::app::dto;
use crate::app::errors::ApiError;
use crate::app::extract::ApiJson;
use crate::app::factory::{self, Repo, parse_id};
use crate::app::routes::{authenticated, guarded};
use crate::app::services::AppServices;
use crate::context::CurrentUser;

const REVIEWERS: &[Role] = &[Role::User];
const REVIEW_EDITORS: &[Role] = &[Role::User, Role::Admin];

/// `/api/v1/reviews`. Every route needs a logged-in user.
pub fn router(services: &Arc<AppServices>) -> Router {
    let repo: Repo = Arc::new(services.reviews.clone());

    Router::new()
        .route(
            "/",
            authenticated(factory::get_all(repo.clone()), services)
                .merge(guarded(post(create_review), services, REVIEWERS)),
        )
        .route(
            "/:id",
            authenticated(factory::get_one(repo), services)
                .merge(guarded(patch(update_review), services, REVIEW_EDITORS))
                .merge(guarded(delete(delete_review), services, REVIEW_EDITORS)),
        )
}

/// `/api/v1/tours/:id/reviews`.
pub fn tour_reviews(services: &Arc<AppServices>) -> MethodRouter {
    authenticated(get(list_tour_reviews), services)
        .merge(guarded(post(create_tour_review), services, REVIEWERS))
}

fn with_author(body: Value, current: &CurrentUser, tour: Option<TourId>) -> Result<Value, ApiError> {
    let Value::Object(mut fields) = body else {
        return Err(ApiError::bad_request("Request body must be a JSON object"));
    };
    fields.insert("user".into(), Value::String(current.id().to_string()));
    if let Some(tour) = tour {
        fields.insert("tour".into(), Value::String(tour.to_string()));
    }
    Ok(Value::Object(fields))
}

async fn create(services: &AppServices, body: Value) -> Result<(StatusCode, Json<Value>), ApiError> {
    let doc = services.reviews.create(body).await?;
    Ok((StatusCode::CREATED, Json(dto::document(doc))))
}

pub async fn create_review(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(current): Extension<CurrentUser>,
    ApiJson(body): ApiJson<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    create(&services, with_author(body, &current, None)?).await
}

pub async fn create_tour_review(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(current): Extension<CurrentUser>,
    Path(tour_id): Path<String>,
    ApiJson(body): ApiJson<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let tour = TourId::from(parse_id(&tour_id)?);
    create(&services, with_author(body, &current, Some(tour))?).await
}

pub async fn list_tour_reviews(
    Extension(services): Extension<Arc<AppServices>>,
    Path(tour_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    let tour = TourId::from(parse_id(&tour_id)?);
    let query = ListQuery::parse(&params, services.reviews.schema())?;
    let docs = services.reviews.find_many(scoped_to_tour(query, tour)).await?;
    Ok(Json(dto::list(docs)))
}

/// The review, if `current` may change it: admins may change any review,
/// everyone else only their own.
async fn editable_review(
    services: &AppServices,
    current: &CurrentUser,
    id: &str,
) -> Result<Review, ApiError> {
    let review = services
        .reviews
        .find(parse_id(id)?.into())
        .await?
        .ok_or_else(|| DomainError::not_found("review"))?;

    if current.role() != Role::Admin && !review.is_written_by(current.id()) {
        return Err(ApiError::forbidden("You can only change your own reviews"));
    }
    Ok(review)
}

pub async fn update_review(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<Value>,
) -> Result<Json<Value>, ApiError> {
    let review = editable_review(&services, &current, &id).await?;
    let doc = services
        .reviews
        .update(review.id.into(), body)
        .await?
        .ok_or_else(|| DomainError::not_found("review"))?;
    Ok(Json(dto::document(doc)))
}

pub async fn delete_review(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let review = editable_review(&services, &current, &id).await?;
    if !services.reviews.delete_review(review.id).await? {
        return Err(DomainError::not_found("review").into());
    }
    Ok(StatusCode::NO_CONTENT)
}
