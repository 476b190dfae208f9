//! Accounts: the authentication flows, self-service on the current account
//! and admin management of every account.

use std::sync::Arc;

use axum::extract::{Extension, Path};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{Value, json};
use tracing::{error, info, warn};

use tourbook_auth::{User, hash_reset_token, validate_new_password};
use tourbook_core::DomainError;
use tourbook_infra::{CrudRepository, Email, SELF_EDITABLE_FIELDS};

use crate::app::cookies;
use crate::app::dto::{
    self, ForgotPasswordRequest, LoginRequest, ResetPasswordRequest, SignupRequest,
    UpdatePasswordRequest,
};
use crate::app::errors::ApiError;
use crate::app::extract::ApiJson;
use crate::app::factory::{self, Repo};
use crate::app::routes::{ADMINS, authenticated, guarded, site_base};
use crate::app::services::AppServices;
use crate::context::CurrentUser;

const BAD_CREDENTIALS: &str = "Incorrect email or password";

pub fn router(services: &Arc<AppServices>) -> Router {
    let repo: Repo = Arc::new(services.users.clone());

    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", get(logout))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password/:token", patch(reset_password))
        .route("/update-password", authenticated(patch(update_password), services))
        .route("/me", authenticated(get(me), services))
        .route("/update-me", authenticated(patch(update_me), services))
        .route("/delete-me", authenticated(delete(delete_me), services))
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

/// Issue a token for `user` and return it both as the session cookie and in
/// the body.
fn send_token(services: &AppServices, user: &User, status: StatusCode) -> Result<Response, ApiError> {
    let now = Utc::now();
    let issued = services.tokens.issue(user.id, user.password_version, now)?;
    let cookie = cookies::session(
        &issued.token,
        now,
        services.config.jwt_cookie_expires_in,
        services.config.environment.is_production(),
    )?;

    Ok((
        status,
        [(header::SET_COOKIE, cookie)],
        Json(dto::auth(&issued.token, &user.profile())),
    )
        .into_response())
}

pub async fn signup(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
    ApiJson(body): ApiJson<SignupRequest>,
) -> Result<Response, ApiError> {
    validate_new_password(&body.password, &body.password_confirm)?;
    let hash = services.passwords.hash(body.password).await?;
    let user = User::register(body.name, body.email, hash, Utc::now())?;
    services.users.insert(&user).await?;

    let url = site_base(&headers)?.join("me").map_err(|e| ApiError::Internal(e.into()))?;
    let email = Email::welcome(&user.email, user.first_name(), url.to_string());
    if let Err(err) = services.mailer.send(email).await {
        warn!(user_id = %user.id, error = %err, "welcome email not delivered");
    }

    send_token(&services, &user, StatusCode::CREATED)
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Response, ApiError> {
    let (Some(email), Some(password)) = (body.email, body.password) else {
        return Err(ApiError::bad_request("Please provide email and password!"));
    };

    let Some(user) = services.users.find_active_by_email(&email).await? else {
        return Err(ApiError::unauthorized(BAD_CREDENTIALS));
    };
    if !services.passwords.verify(password, user.password.clone()).await? {
        return Err(ApiError::unauthorized(BAD_CREDENTIALS));
    }

    info!(user_id = %user.id, "user logged in");
    send_token(&services, &user, StatusCode::OK)
}

pub async fn logout() -> Result<impl IntoResponse, ApiError> {
    let cookie: HeaderValue = cookies::logged_out(Utc::now())?;
    Ok(([(header::SET_COOKIE, cookie)], Json(json!({ "status": "success" }))))
}

pub async fn forgot_password(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
    ApiJson(body): ApiJson<ForgotPasswordRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut user = services
        .users
        .find_active_by_email(&body.email)
        .await?
        .ok_or_else(|| ApiError::not_found("There is no user with that email address."))?;

    let token = user.issue_reset_token(Utc::now());
    services.users.save(&user).await?;

    let url = site_base(&headers)?
        .join(&format!("api/v1/users/reset-password/{token}"))
        .map_err(|e| ApiError::Internal(e.into()))?;
    let email = Email::password_reset(&user.email, user.first_name(), url.to_string());

    if let Err(err) = services.mailer.send(email).await {
        error!(user_id = %user.id, error = %err, "password reset email not delivered");
        user.clear_reset_token();
        services.users.save(&user).await?;
        return Err(ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "There was an error sending the email. Try again later!",
        ));
    }

    Ok(Json(dto::message("Token sent to email!")))
}

pub async fn reset_password(
    Extension(services): Extension<Arc<AppServices>>,
    Path(token): Path<String>,
    ApiJson(body): ApiJson<ResetPasswordRequest>,
) -> Result<Response, ApiError> {
    let now = Utc::now();
    let mut user = services
        .users
        .find_by_reset_token(&hash_reset_token(&token), now)
        .await?
        .ok_or_else(|| ApiError::bad_request("Token is invalid or has expired"))?;

    validate_new_password(&body.password, &body.password_confirm)?;
    let hash = services.passwords.hash(body.password).await?;
    user.set_password(hash, now);
    services.users.save(&user).await?;

    info!(user_id = %user.id, "password reset");
    send_token(&services, &user, StatusCode::OK)
}

pub async fn update_password(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(CurrentUser(mut user)): Extension<CurrentUser>,
    ApiJson(body): ApiJson<UpdatePasswordRequest>,
) -> Result<Response, ApiError> {
    if !services.passwords.verify(body.password, user.password.clone()).await? {
        return Err(ApiError::unauthorized("Your current password is wrong."));
    }

    validate_new_password(&body.new_password, &body.password_confirm)?;
    let hash = services.passwords.hash(body.new_password).await?;
    user.set_password(hash, Utc::now());
    services.users.save(&user).await?;

    send_token(&services, &user, StatusCode::OK)
}

pub async fn me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<Value>, ApiError> {
    let doc = services
        .users
        .find_one(current.id().into())
        .await?
        .ok_or_else(|| DomainError::not_found("user"))?;
    Ok(Json(dto::document(doc)))
}

pub async fn update_me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(current): Extension<CurrentUser>,
    ApiJson(body): ApiJson<Value>,
) -> Result<Json<Value>, ApiError> {
    let user = services
        .users
        .update_fields(current.id(), &body, SELF_EDITABLE_FIELDS)
        .await?
        .ok_or_else(|| DomainError::not_found("user"))?;
    Ok(Json(dto::named("user", user.profile())))
}

pub async fn delete_me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<StatusCode, ApiError> {
    services.users.soft_delete(current.id()).await?;
    Ok(StatusCode::NO_CONTENT)
}
