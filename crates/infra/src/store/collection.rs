use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use tourbook_core::Entity;
use tourbook_query::{FieldSchema, ListQuery};

use super::{Document, DocumentStore, StoreError};
use crate::error::RepositoryError;

/// Typed view of one collection.
///
/// Every write validates the entity first, so nothing invalid reaches the store.
pub struct Collection<T> {
    store: Arc<dyn DocumentStore>,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> Collection<T> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }

    pub async fn insert(&self, entity: &T) -> Result<(), RepositoryError> {
        entity.validate()?;
        self.store.insert(T::COLLECTION, to_document(entity)?).await?;
        Ok(())
    }

    pub async fn get(&self, id: T::Id) -> Result<Option<T>, RepositoryError> {
        let body = self.store.get(T::COLLECTION, id.into()).await?;
        body.map(decode).transpose().map_err(Into::into)
    }

    /// The entity with the revision it was read at, for [`Collection::replace_if`].
    pub async fn get_revisioned(&self, id: T::Id) -> Result<Option<(T, i64)>, RepositoryError> {
        let Some(stored) = self.store.get_revisioned(T::COLLECTION, id.into()).await? else {
            return Ok(None);
        };
        Ok(Some((decode(stored.body)?, stored.revision)))
    }

    pub async fn find_by_key(&self, field: &str, value: &str) -> Result<Option<T>, RepositoryError> {
        let body = self.store.find_by_key(T::COLLECTION, field, value).await?;
        body.map(decode).transpose().map_err(Into::into)
    }

    /// Returns `false` when the entity no longer exists.
    pub async fn replace(&self, entity: &T) -> Result<bool, RepositoryError> {
        entity.validate()?;
        Ok(self.store.replace(T::COLLECTION, to_document(entity)?).await?)
    }

    /// Returns `false` when the entity is gone or was written after `revision`.
    pub async fn replace_if(&self, entity: &T, revision: i64) -> Result<bool, RepositoryError> {
        entity.validate()?;
        Ok(self
            .store
            .replace_if(T::COLLECTION, to_document(entity)?, revision)
            .await?)
    }

    pub async fn delete(&self, id: T::Id) -> Result<bool, RepositoryError> {
        Ok(self.store.delete(T::COLLECTION, id.into()).await?)
    }

    pub async fn all(&self) -> Result<Vec<T>, RepositoryError> {
        let bodies = self.store.scan(T::COLLECTION).await?;
        bodies
            .into_iter()
            .map(decode)
            .collect::<Result<Vec<T>, StoreError>>()
            .map_err(Into::into)
    }

    /// Run list directives over the stored documents.
    pub async fn query(&self, query: &ListQuery, schema: &FieldSchema) -> Result<Vec<Value>, RepositoryError> {
        let bodies = self.store.scan(T::COLLECTION).await?;
        Ok(query.execute(bodies, schema))
    }
}

fn to_document<T: Entity>(entity: &T) -> Result<Document, StoreError> {
    let body = serde_json::to_value(entity).map_err(|e| StoreError::Corrupt(e.to_string()))?;
    Ok(Document {
        id: entity.id().into(),
        body,
        unique_keys: entity.unique_keys(),
    })
}

fn decode<T: DeserializeOwned>(body: Value) -> Result<T, StoreError> {
    serde_json::from_value(body).map_err(|e| StoreError::Corrupt(e.to_string()))
}
