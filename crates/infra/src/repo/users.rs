use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::info;
use uuid::Uuid;

use tourbook_auth::{User, UserProfile};
use tourbook_core::{DomainError, UserId, apply_patch};
use tourbook_query::{FieldSchema, Filter, FilterValue, ListQuery};

use super::{CrudRepository, USER_FIELDS, redacted};
use crate::error::RepositoryError;
use crate::store::{Collection, DocumentStore};

/// Fields a user may change on their own account.
pub const SELF_EDITABLE_FIELDS: &[&str] = &["name", "email"];

/// Fields an administrator may change on any account.
pub const ADMIN_EDITABLE_FIELDS: &[&str] = &["name", "email", "photo", "role"];

const PASSWORD_FIELDS: [&str; 2] = ["password", "passwordConfirm"];

/// Accounts. Soft-deleted users are invisible to every read.
#[derive(Clone)]
pub struct UserRepository {
    users: Collection<User>,
}

impl UserRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            users: Collection::new(store),
        }
    }

    pub async fn insert(&self, user: &User) -> Result<(), RepositoryError> {
        self.users.insert(user).await?;
        info!(user_id = %user.id, role = %user.role, "user created");
        Ok(())
    }

    pub async fn find_active(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.get(id).await?.filter(|u| !u.deleted))
    }

    pub async fn find_active_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let email = email.trim().to_lowercase();
        Ok(self
            .users
            .find_by_key("email", &email)
            .await?
            .filter(|u| !u.deleted))
    }

    /// The active user holding an unexpired reset token with this hash.
    pub async fn find_by_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .users
            .all()
            .await?
            .into_iter()
            .find(|u| !u.deleted && u.reset_token_matches(token_hash, now)))
    }

    /// Persist changes to an existing account.
    pub async fn save(&self, user: &User) -> Result<(), RepositoryError> {
        if !self.users.replace(user).await? {
            return Err(DomainError::not_found("user").into());
        }
        Ok(())
    }

    pub async fn list_active_users(&self, query: ListQuery) -> Result<Vec<Value>, RepositoryError> {
        let query = query.and(Filter::ne("deleted", FilterValue::Bool(true)));
        self.users.query(&query, &USER_FIELDS).await
    }

    /// Public profiles for `ids`, in the same order, skipping unknown or
    /// deleted accounts.
    pub async fn profiles(&self, ids: &[UserId]) -> Result<Vec<UserProfile>, RepositoryError> {
        let mut profiles = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(user) = self.find_active(*id).await? {
                profiles.push(user.profile());
            }
        }
        Ok(profiles)
    }

    /// Apply a partial update restricted to `allowed` fields. Other keys are
    /// dropped; password keys are rejected outright.
    pub async fn update_fields(
        &self,
        id: UserId,
        patch: &Value,
        allowed: &[&str],
    ) -> Result<Option<User>, RepositoryError> {
        let Value::Object(fields) = patch else {
            return Err(DomainError::malformed("Request body must be a JSON object").into());
        };
        if PASSWORD_FIELDS.iter().any(|f| fields.contains_key(*f)) {
            return Err(DomainError::malformed(
                "This route is not for password updates. Please use /update-password.",
            )
            .into());
        }

        let Some(current) = self.find_active(id).await? else {
            return Ok(None);
        };

        let filtered: Map<String, Value> = fields
            .iter()
            .filter(|(key, _)| allowed.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let updated = apply_patch(&current, &Value::Object(filtered))?;
        self.save(&updated).await?;
        Ok(Some(updated))
    }

    /// Mark the account deleted. Returns `false` when there is no active
    /// account with that id.
    pub async fn soft_delete(&self, id: UserId) -> Result<bool, RepositoryError> {
        let Some(mut user) = self.find_active(id).await? else {
            return Ok(false);
        };
        user.soft_delete();
        self.save(&user).await?;
        info!(user_id = %id, "user deactivated");
        Ok(true)
    }
}

#[async_trait]
impl CrudRepository for UserRepository {
    fn schema(&self) -> &'static FieldSchema {
        &USER_FIELDS
    }

    fn label(&self) -> &'static str {
        "user"
    }

    async fn create(&self, _input: Value) -> Result<Value, RepositoryError> {
        Err(DomainError::malformed("This route is not defined! Please use /signup instead").into())
    }

    async fn find_one(&self, id: Uuid) -> Result<Option<Value>, RepositoryError> {
        self.find_active(id.into())
            .await?
            .map(|u| redacted(&u, &USER_FIELDS))
            .transpose()
    }

    async fn find_many(&self, query: ListQuery) -> Result<Vec<Value>, RepositoryError> {
        self.list_active_users(query).await
    }

    async fn update(&self, id: Uuid, patch: Value) -> Result<Option<Value>, RepositoryError> {
        self.update_fields(id.into(), &patch, ADMIN_EDITABLE_FIELDS)
            .await?
            .map(|u| redacted(&u, &USER_FIELDS))
            .transpose()
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        self.soft_delete(id.into()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::fixtures;
    use serde_json::json;
    use tourbook_auth::Role;

    fn repo() -> UserRepository {
        UserRepository::new(fixtures::store())
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let repo = repo();
        repo.insert(&fixtures::user("Ann", "ann@example.io", Role::User))
            .await
            .unwrap();
        let err = repo
            .insert(&fixtures::user("Other Ann", "ANN@example.io", Role::User))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::Domain(DomainError::Duplicate { .. })
        ));
    }

    #[tokio::test]
    async fn soft_deleted_users_disappear_from_reads() {
        let repo = repo();
        let ann = fixtures::user("Ann", "ann@example.io", Role::User);
        let bob = fixtures::user("Bob", "bob@example.io", Role::Guide);
        repo.insert(&ann).await.unwrap();
        repo.insert(&bob).await.unwrap();

        assert!(repo.soft_delete(ann.id).await.unwrap());
        assert!(!repo.soft_delete(ann.id).await.unwrap());

        assert!(repo.find_active(ann.id).await.unwrap().is_none());
        assert!(repo.find_active_by_email("ann@example.io").await.unwrap().is_none());

        let listed = repo
            .list_active_users(ListQuery::unfiltered(&USER_FIELDS))
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0]["email"], "bob@example.io");
        assert!(listed[0].get("password").is_none());
        assert!(listed[0].get("deleted").is_none());

        let profiles = repo.profiles(&[ann.id, bob.id]).await.unwrap();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].id, bob.id);
    }

    #[tokio::test]
    async fn self_service_update_keeps_to_allowed_fields() {
        let repo = repo();
        let ann = fixtures::user("Ann", "ann@example.io", Role::User);
        repo.insert(&ann).await.unwrap();

        let updated = repo
            .update_fields(
                ann.id,
                &json!({ "name": "Ann Lee", "role": "admin", "photo": "x.jpg" }),
                SELF_EDITABLE_FIELDS,
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "Ann Lee");
        assert_eq!(updated.role, Role::User);
        assert_eq!(updated.photo, "default.jpg");

        let err = repo
            .update_fields(ann.id, &json!({ "password": "newpass123" }), SELF_EDITABLE_FIELDS)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("/update-password"));
    }

    #[tokio::test]
    async fn admin_update_can_change_role() {
        let repo = repo();
        let ann = fixtures::user("Ann", "ann@example.io", Role::User);
        repo.insert(&ann).await.unwrap();

        let doc = repo
            .update(ann.id.into(), json!({ "role": "lead-guide" }))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc["role"], "lead-guide");
        assert!(doc.get("password").is_none());

        assert!(repo.update(Uuid::now_v7(), json!({})).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reset_token_lookup_respects_expiry() {
        let repo = repo();
        let mut ann = fixtures::user("Ann", "ann@example.io", Role::User);
        let now = Utc::now();
        let plain = ann.issue_reset_token(now);
        repo.insert(&ann).await.unwrap();

        let hash = tourbook_auth::hash_reset_token(&plain);
        assert!(repo.find_by_reset_token(&hash, now).await.unwrap().is_some());
        assert!(
            repo.find_by_reset_token(&hash, now + chrono::Duration::minutes(11))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn create_through_crud_points_to_signup() {
        let err = repo().create(json!({})).await.unwrap_err();
        assert!(err.to_string().contains("/signup"));
    }
}
