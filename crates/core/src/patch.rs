//! Partial updates: merge a JSON object into an entity and re-validate.

use serde_json::Value;

use crate::entity::Entity;
use crate::error::{DomainError, DomainResult};

/// Merge the top-level fields of `patch` into `current`.
///
/// Immutable fields (and `id`) are skipped; unknown fields are ignored by
/// deserialization. The merged entity is normalized and fully validated before
/// it is returned.
pub fn apply_patch<T: Entity>(current: &T, patch: &Value) -> DomainResult<T> {
    let Value::Object(changes) = patch else {
        return Err(DomainError::validation("update body must be a JSON object"));
    };

    let mut doc = serde_json::to_value(current)
        .map_err(|e| DomainError::validation(e.to_string()))?;
    let Value::Object(fields) = &mut doc else {
        return Err(DomainError::validation("entity did not serialize to an object"));
    };

    for (key, value) in changes {
        if key == "id" || T::IMMUTABLE_FIELDS.contains(&key.as_str()) {
            continue;
        }
        fields.insert(key.clone(), value.clone());
    }

    let mut updated: T =
        serde_json::from_value(doc).map_err(|e| DomainError::validation(e.to_string()))?;
    updated.normalize();
    updated.validate()?;
    Ok(updated)
}
