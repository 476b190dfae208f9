use axum::extract::FromRequest;

use crate::app::errors::ApiError;

/// `axum::Json` whose rejections render like every other API error.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);
