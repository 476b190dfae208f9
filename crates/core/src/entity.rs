//! Entity trait: identity plus the storage contract shared by every document.

use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::DomainResult;

/// A value that must be unique within its collection (email, tour name, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UniqueKey {
    /// Field label used in duplicate-key messages.
    pub field: &'static str,
    pub value: String,
}

impl UniqueKey {
    pub fn new(field: &'static str, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }
}

/// A persisted document.
///
/// Implementors serialize to the JSON body kept by the document store. The
/// same serialized form is what the query layer filters, sorts and projects.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug + Into<Uuid> + From<Uuid>;

    /// Store collection name.
    const COLLECTION: &'static str;

    /// Singular label used in "No <label> found" messages.
    const LABEL: &'static str;

    /// Fields a partial update may not touch. `id` is always immutable.
    const IMMUTABLE_FIELDS: &'static [&'static str] = &["createdAt"];

    fn id(&self) -> Self::Id;

    /// Check every field invariant, reporting all violations at once.
    fn validate(&self) -> DomainResult<()>;

    /// Keys that must not collide with another document in the collection.
    fn unique_keys(&self) -> Vec<UniqueKey> {
        Vec::new()
    }

    /// Recompute derived fields after a partial update has been merged in.
    fn normalize(&mut self) {}
}
