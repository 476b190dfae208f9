use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Extension, Path, Query};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::Value;

use tourbook_auth::Role;
use tourbook_core::{DistanceUnit, GeoPoint};

use crate::app::dto;
use crate::app::errors::ApiError;
use crate::app::factory::{self, Repo};
use crate::app::routes::{ADMINS, guarded, reviews};
use crate::app::services::AppServices;

const TOUR_EDITORS: &[Role] = &[Role::Admin, Role::LeadGuide];
const PLANNERS: &[Role] = &[Role::Admin, Role::LeadGuide, Role::Guide];

const TOP_FIVE_CHEAP: [(&str, &str); 4] = [
    ("page", "1"),
    ("limit", "5"),
    ("sort", "-ratingsAverage,price"),
    ("fields", "name,price,ratingsAverage,summary,difficulty"),
];

pub fn router(services: &Arc<AppServices>) -> Router {
    let repo: Repo = Arc::new(services.tours.clone());

    Router::new()
        .route(
            "/",
            factory::get_all(repo.clone())
                .merge(guarded(factory::create_one(repo.clone()), services, TOUR_EDITORS)),
        )
        .route("/top-5-cheap", get(top_five_cheap))
        .route("/stats", get(tour_stats))
        .route(
            "/monthly-plan/:year",
            guarded(get(monthly_plan), services, PLANNERS),
        )
        .route(
            "/tours-within/:distance/center/:latlng/unit/:unit",
            get(tours_within),
        )
        .route("/distance/:latlng/unit/:unit", get(distances))
        .route(
            "/:id",
            factory::get_one(repo.clone())
                .merge(guarded(factory::update_one(repo.clone()), services, TOUR_EDITORS))
                .merge(guarded(factory::delete_one(repo), services, ADMINS)),
        )
        .route("/:id/reviews", reviews::tour_reviews(services))
}

pub async fn top_five_cheap(
    Extension(services): Extension<Arc<AppServices>>,
    Query(mut params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    for (key, value) in TOP_FIVE_CHEAP {
        params.insert(key.to_string(), value.to_string());
    }
    factory::list_documents(Arc::new(services.tours.clone()), params).await
}

pub async fn tour_stats(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<Json<Value>, ApiError> {
    let stats = services.tours.difficulty_stats().await?;
    Ok(Json(dto::named("stats", stats)))
}

pub async fn monthly_plan(
    Extension(services): Extension<Arc<AppServices>>,
    Path(year): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let year: i32 = year
        .parse()
        .map_err(|_| ApiError::bad_request(format!("Invalid year: {year}")))?;
    let plan = services.tours.monthly_plan(year).await?;
    Ok(Json(dto::named("plan", plan)))
}

pub async fn tours_within(
    Extension(services): Extension<Arc<AppServices>>,
    Path((distance, latlng, unit)): Path<(String, String, String)>,
) -> Result<Json<Value>, ApiError> {
    let distance: f64 = distance
        .parse()
        .ok()
        .filter(|d: &f64| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| ApiError::bad_request(format!("Invalid distance: {distance}")))?;
    let center = GeoPoint::parse_lat_lng(&latlng)?;
    let unit: DistanceUnit = unit.parse()?;

    let tours = services.tours.tours_within(center, distance, unit).await?;
    Ok(Json(dto::list(tours)))
}

pub async fn distances(
    Extension(services): Extension<Arc<AppServices>>,
    Path((latlng, unit)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let center = GeoPoint::parse_lat_lng(&latlng)?;
    let unit: DistanceUnit = unit.parse()?;

    let distances = services.tours.distances(center, unit).await?;
    Ok(Json(dto::document(distances)))
}
