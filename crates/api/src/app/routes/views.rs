//! Server-rendered pages.

use std::sync::Arc;

use axum::Router;
use axum::extract::{Extension, Path};
use axum::middleware::from_fn_with_state;
use axum::response::Html;
use axum::routing::{MethodRouter, get};

use crate::app::errors::ApiError;
use crate::app::html;
use crate::app::routes::authenticated;
use crate::app::services::AppServices;
use crate::context::{CurrentUser, Viewer};
use crate::middleware;

pub fn router(services: &Arc<AppServices>) -> Router {
    let browsing = |route: MethodRouter| {
        route.route_layer(from_fn_with_state(services.clone(), middleware::optional_auth))
    };

    Router::new()
        .route("/", browsing(get(overview)))
        .route("/tours/:slug", browsing(get(tour)))
        .route("/login", browsing(get(login)))
        .route("/account", authenticated(get(account), services))
        .route("/my-tours", authenticated(get(my_tours), services))
}

pub async fn overview(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(Viewer(viewer)): Extension<Viewer>,
) -> Result<Html<String>, ApiError> {
    let tours = services.tours.public_tours().await?;
    Ok(Html(html::overview("All Tours", &tours, viewer.as_ref())))
}

pub async fn tour(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(Viewer(viewer)): Extension<Viewer>,
    Path(slug): Path<String>,
) -> Result<Html<String>, ApiError> {
    let details = services
        .tours
        .find_by_slug_with_guides(&slug)
        .await?
        .ok_or_else(|| ApiError::not_found("There is no tour with that name."))?;
    Ok(Html(html::tour_page(&details, viewer.as_ref())))
}

pub async fn login(Extension(Viewer(viewer)): Extension<Viewer>) -> Html<String> {
    Html(html::login_page(viewer.as_ref()))
}

pub async fn account(Extension(CurrentUser(user)): Extension<CurrentUser>) -> Html<String> {
    Html(html::account_page(&user))
}

pub async fn my_tours(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Html<String>, ApiError> {
    let tours = services.bookings.tours_booked_by(user.id).await?;
    Ok(Html(html::overview("My Tours", &tours, Some(&user))))
}
