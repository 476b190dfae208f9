use thiserror::Error;

use tourbook_core::DomainError;
use tourbook_query::QueryError;

use crate::store::StoreError;

/// Failure of a repository operation.
///
/// Unique-key collisions reported by the store are lifted into
/// [`DomainError::Duplicate`] so callers only match on one shape.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for RepositoryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate { field, value } => {
                Self::Domain(DomainError::duplicate(field, value))
            }
            other => Self::Store(other),
        }
    }
}
