//! Generic resource handlers.
//!
//! Each builder closes over one repository and yields a method router, so a
//! resource's routes are assembled from the same five operations.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::routing::{MethodRouter, delete, get, patch, post};
use serde_json::Value;
use uuid::Uuid;

use tourbook_core::DomainError;
use tourbook_infra::CrudRepository;
use tourbook_query::ListQuery;

use crate::app::dto;
use crate::app::errors::ApiError;
use crate::app::extract::ApiJson;

pub type Repo = Arc<dyn CrudRepository>;

pub fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::bad_request(format!("Invalid id: {raw}")))
}

pub async fn list_documents(
    repo: Repo,
    params: HashMap<String, String>,
) -> Result<Json<Value>, ApiError> {
    let query = ListQuery::parse(&params, repo.schema())?;
    let docs = repo.find_many(query).await?;
    Ok(Json(dto::list(docs)))
}

async fn read_document(repo: Repo, id: String) -> Result<Json<Value>, ApiError> {
    let doc = repo
        .find_one(parse_id(&id)?)
        .await?
        .ok_or_else(|| DomainError::not_found(repo.label()))?;
    Ok(Json(dto::document(doc)))
}

async fn create_document(repo: Repo, body: Value) -> Result<(StatusCode, Json<Value>), ApiError> {
    let doc = repo.create(body).await?;
    Ok((StatusCode::CREATED, Json(dto::document(doc))))
}

async fn update_document(repo: Repo, id: String, body: Value) -> Result<Json<Value>, ApiError> {
    let doc = repo
        .update(parse_id(&id)?, body)
        .await?
        .ok_or_else(|| DomainError::not_found(repo.label()))?;
    Ok(Json(dto::document(doc)))
}

async fn delete_document(repo: Repo, id: String) -> Result<StatusCode, ApiError> {
    if !repo.delete(parse_id(&id)?).await? {
        return Err(DomainError::not_found(repo.label()).into());
    }
    Ok(StatusCode::NO_CONTENT)
}

pub fn get_all(repo: Repo) -> MethodRouter {
    get(move |Query(params): Query<HashMap<String, String>>| list_documents(repo.clone(), params))
}

pub fn get_one(repo: Repo) -> MethodRouter {
    get(move |Path(id): Path<String>| read_document(repo.clone(), id))
}

pub fn create_one(repo: Repo) -> MethodRouter {
    post(move |ApiJson(body): ApiJson<Value>| create_document(repo.clone(), body))
}

pub fn update_one(repo: Repo) -> MethodRouter {
    patch(move |Path(id): Path<String>, ApiJson(body): ApiJson<Value>| {
        update_document(repo.clone(), id, body)
    })
}

pub fn delete_one(repo: Repo) -> MethodRouter {
    delete(move |Path(id): Path<String>| delete_document(repo.clone(), id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_ids_are_bad_requests() {
        let err = parse_id("not-an-id").unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Invalid id: not-an-id");
        assert!(parse_id("018f3a20-0000-7000-8000-000000000001").is_ok());
    }
}
