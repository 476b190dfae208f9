//! Document storage.
//!
//! Documents are JSON objects keyed by UUID within a named collection. Each
//! document may claim unique keys; a key held by another document makes the
//! write fail with [`StoreError::Duplicate`].
//!
//! Every write bumps the document's revision. Read-modify-write callers read
//! the revision with [`DocumentStore::get_revisioned`] and write back with
//! [`DocumentStore::replace_if`], which refuses when another writer got there
//! first.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use tourbook_core::UniqueKey;

mod collection;
mod in_memory;
mod postgres;

pub use collection::Collection;
pub use in_memory::InMemoryDocumentStore;
pub use postgres::PostgresDocumentStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate {field}: {value}")]
    Duplicate { field: String, value: String },

    #[error("stored document could not be decoded: {0}")]
    Corrupt(String),

    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// A stored body together with the revision it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct Revisioned {
    pub body: Value,
    pub revision: i64,
}

/// A document ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: Uuid,
    pub body: Value,
    pub unique_keys: Vec<UniqueKey>,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert(&self, collection: &str, doc: Document) -> Result<(), StoreError>;

    async fn get(&self, collection: &str, id: Uuid) -> Result<Option<Value>, StoreError>;

    async fn get_revisioned(
        &self,
        collection: &str,
        id: Uuid,
    ) -> Result<Option<Revisioned>, StoreError>;

    /// Look a document up by one of its unique keys.
    async fn find_by_key(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Option<Value>, StoreError>;

    /// Overwrite an existing document and re-claim its keys.
    /// Returns `false` when no document has that id.
    async fn replace(&self, collection: &str, doc: Document) -> Result<bool, StoreError>;

    /// Like [`DocumentStore::replace`], but only while the stored revision is
    /// still `revision`. Returns `false` when the document is gone or has
    /// been written since.
    async fn replace_if(
        &self,
        collection: &str,
        doc: Document,
        revision: i64,
    ) -> Result<bool, StoreError>;

    async fn delete(&self, collection: &str, id: Uuid) -> Result<bool, StoreError>;

    /// Every document in the collection, oldest id first.
    async fn scan(&self, collection: &str) -> Result<Vec<Value>, StoreError>;
}
