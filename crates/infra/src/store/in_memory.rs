use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use super::{Document, DocumentStore, Revisioned, StoreError};

#[derive(Debug, Default)]
struct CollectionData {
    docs: BTreeMap<Uuid, Revisioned>,
    /// (field, value) -> owning document.
    keys: HashMap<(String, String), Uuid>,
}

impl CollectionData {
    fn check_keys(&self, doc: &Document) -> Result<(), StoreError> {
        for key in &doc.unique_keys {
            match self.keys.get(&(key.field.to_string(), key.value.clone())) {
                Some(owner) if *owner != doc.id => {
                    return Err(StoreError::Duplicate {
                        field: key.field.to_string(),
                        value: key.value.clone(),
                    });
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn claim_keys(&mut self, doc: &Document) {
        self.keys.retain(|_, owner| *owner != doc.id);
        for key in &doc.unique_keys {
            self.keys
                .insert((key.field.to_string(), key.value.clone()), doc.id);
        }
    }

    /// Overwrite `doc` when it exists and, if given, is still at `expected`.
    fn overwrite(&mut self, doc: Document, expected: Option<i64>) -> Result<bool, StoreError> {
        let Some(current) = self.docs.get(&doc.id).map(|d| d.revision) else {
            return Ok(false);
        };
        if expected.is_some_and(|rev| rev != current) {
            return Ok(false);
        }
        self.check_keys(&doc)?;
        self.claim_keys(&doc);
        self.docs.insert(
            doc.id,
            Revisioned {
                body: doc.body,
                revision: current + 1,
            },
        );
        Ok(true)
    }
}

/// In-memory document store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    inner: RwLock<HashMap<String, CollectionData>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> StoreError {
    StoreError::Backend("in-memory store lock poisoned".to_string())
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn insert(&self, collection: &str, doc: Document) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        let data = map.entry(collection.to_string()).or_default();
        if data.docs.contains_key(&doc.id) {
            return Err(StoreError::Duplicate {
                field: "id".to_string(),
                value: doc.id.to_string(),
            });
        }
        data.check_keys(&doc)?;
        data.claim_keys(&doc);
        data.docs.insert(
            doc.id,
            Revisioned {
                body: doc.body,
                revision: 0,
            },
        );
        Ok(())
    }

    async fn get(&self, collection: &str, id: Uuid) -> Result<Option<Value>, StoreError> {
        Ok(self.get_revisioned(collection, id).await?.map(|d| d.body))
    }

    async fn get_revisioned(
        &self,
        collection: &str,
        id: Uuid,
    ) -> Result<Option<Revisioned>, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.get(collection).and_then(|data| data.docs.get(&id)).cloned())
    }

    async fn find_by_key(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Option<Value>, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.get(collection).and_then(|data| {
            let owner = data.keys.get(&(field.to_string(), value.to_string()))?;
            data.docs.get(owner).map(|d| d.body.clone())
        }))
    }

    async fn replace(&self, collection: &str, doc: Document) -> Result<bool, StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        match map.get_mut(collection) {
            Some(data) => data.overwrite(doc, None),
            None => Ok(false),
        }
    }

    async fn replace_if(
        &self,
        collection: &str,
        doc: Document,
        revision: i64,
    ) -> Result<bool, StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        match map.get_mut(collection) {
            Some(data) => data.overwrite(doc, Some(revision)),
            None => Ok(false),
        }
    }

    async fn delete(&self, collection: &str, id: Uuid) -> Result<bool, StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        let Some(data) = map.get_mut(collection) else {
            return Ok(false);
        };
        let removed = data.docs.remove(&id).is_some();
        if removed {
            data.keys.retain(|_, owner| *owner != id);
        }
        Ok(removed)
    }

    async fn scan(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map
            .get(collection)
            .map(|data| data.docs.values().map(|d| d.body.clone()).collect())
            .unwrap_or_default())
    }
}
