//! Repositories: one per resource, each owning the rules that span documents
//! (visibility scopes, reference checks, rating bookkeeping).
//!
//! Every repository also implements [`CrudRepository`], the untyped surface
//! the generic HTTP handlers are written against.

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use tourbook_core::DomainError;
use tourbook_query::{Field, FieldSchema, ListQuery};

use crate::error::RepositoryError;

mod bookings;
mod reviews;
mod tours;
mod users;

pub use bookings::BookingRepository;
pub use reviews::{ReviewAuthor, ReviewRepository, ReviewView, scoped_to_tour};
pub use tours::{TourDetails, TourRepository};
pub use users::{ADMIN_EDITABLE_FIELDS, SELF_EDITABLE_FIELDS, UserRepository};

/// Resource operations over JSON documents.
///
/// Returned documents are already redacted with [`CrudRepository::schema`].
#[async_trait]
pub trait CrudRepository: Send + Sync {
    fn schema(&self) -> &'static FieldSchema;

    /// Singular resource label for "No <label> found" messages.
    fn label(&self) -> &'static str;

    async fn create(&self, input: Value) -> Result<Value, RepositoryError>;

    async fn find_one(&self, id: Uuid) -> Result<Option<Value>, RepositoryError>;

    async fn find_many(&self, query: ListQuery) -> Result<Vec<Value>, RepositoryError>;

    /// Merge `patch` into the document. `None` when it does not exist.
    async fn update(&self, id: Uuid, patch: Value) -> Result<Option<Value>, RepositoryError>;

    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError>;
}

pub static USER_FIELDS: FieldSchema = FieldSchema::new(
    &[
        Field::id("id"),
        Field::text("name"),
        Field::text("email"),
        Field::text("role"),
        Field::opaque("photo"),
        Field::date("createdAt"),
    ],
    &[
        "password",
        "passwordChangedAt",
        "passwordVersion",
        "passwordResetToken",
        "passwordResetExpires",
        "deleted",
    ],
);

pub static TOUR_FIELDS: FieldSchema = FieldSchema::new(
    &[
        Field::id("id"),
        Field::text("name"),
        Field::text("slug"),
        Field::number("duration"),
        Field::number("maxGroupSize"),
        Field::text("difficulty"),
        Field::number("ratingsAverage"),
        Field::number("ratingsQuantity"),
        Field::number("price"),
        Field::number("priceDiscount"),
        Field::text("summary"),
        Field::opaque("description"),
        Field::opaque("imageCover"),
        Field::opaque("images"),
        Field::date("createdAt"),
        Field::date("startDates"),
        Field::opaque("startLocation"),
        Field::opaque("locations"),
        Field::id("guides"),
    ],
    &["secret"],
);

pub static REVIEW_FIELDS: FieldSchema = FieldSchema::new(
    &[
        Field::id("id"),
        Field::text("review"),
        Field::number("rating"),
        Field::id("tour"),
        Field::id("user"),
        Field::date("createdAt"),
    ],
    &[],
);

pub static BOOKING_FIELDS: FieldSchema = FieldSchema::new(
    &[
        Field::id("id"),
        Field::id("tour"),
        Field::id("user"),
        Field::number("price"),
        Field::boolean("paid"),
        Field::date("createdAt"),
    ],
    &[],
);

/// Revision-checked read-modify-write cycles give up after this many lost races.
pub(crate) const MAX_WRITE_ATTEMPTS: usize = 64;

pub(crate) fn write_contended(resource: &str) -> RepositoryError {
    DomainError::conflict(format!(
        "This {resource} is being changed by another request. Please try again."
    ))
    .into()
}

/// Serialize an entity and strip fields that never leave the server.
pub(crate) fn redacted<T: serde::Serialize>(
    entity: &T,
    schema: &FieldSchema,
) -> Result<Value, RepositoryError> {
    let mut doc = serde_json::to_value(entity)
        .map_err(|e| crate::store::StoreError::Corrupt(e.to_string()))?;
    schema.redact(&mut doc);
    Ok(doc)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::sync::Arc;

    use chrono::Utc;
    use serde_json::{Value, json};

    use tourbook_auth::{Role, User};
    use tourbook_tours::{NewTour, Tour};

    use crate::store::{DocumentStore, InMemoryDocumentStore};

    pub fn store() -> Arc<dyn DocumentStore> {
        Arc::new(InMemoryDocumentStore::new())
    }

    pub fn user(name: &str, email: &str, role: Role) -> User {
        User::register(name, email, "$2b$04$hash".into(), Utc::now())
            .unwrap()
            .with_role(role)
    }

    pub fn tour_json(name: &str, price: f64) -> Value {
        json!({
            "name": name,
            "duration": 5,
            "maxGroupSize": 10,
            "difficulty": "easy",
            "price": price,
            "summary": "Breathtaking hike",
            "imageCover": "tour-1-cover.jpg",
            "startDates": ["2021-04-25T09:00:00Z", "2021-07-20T09:00:00Z"],
            "startLocation": {
                "type": "Point",
                "coordinates": [-116.214531, 51.417611],
                "address": "Banff, CAN"
            }
        })
    }

    pub fn tour(name: &str, price: f64) -> Tour {
        let input: NewTour = serde_json::from_value(tour_json(name, price)).unwrap();
        Tour::create(input, Utc::now()).unwrap()
    }
}
