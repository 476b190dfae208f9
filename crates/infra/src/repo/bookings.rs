use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use tourbook_bookings::{Booking, NewBooking};
use tourbook_core::{DomainError, UserId, apply_patch};
use tourbook_query::{FieldSchema, ListQuery};
use tourbook_tours::Tour;

use super::{BOOKING_FIELDS, CrudRepository, TOUR_FIELDS, UserRepository, redacted};
use crate::error::RepositoryError;
use crate::store::{Collection, DocumentStore};

#[derive(Clone)]
pub struct BookingRepository {
    bookings: Collection<Booking>,
    tours: Collection<Tour>,
    users: UserRepository,
}

impl BookingRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            bookings: Collection::new(store.clone()),
            tours: Collection::new(store.clone()),
            users: UserRepository::new(store),
        }
    }

    pub async fn create_booking(&self, input: NewBooking) -> Result<Booking, RepositoryError> {
        if self.tours.get(input.tour).await?.is_none() {
            return Err(DomainError::not_found("tour").into());
        }
        if self.users.find_active(input.user).await?.is_none() {
            return Err(DomainError::not_found("user").into());
        }
        let booking = Booking::create(input, Utc::now())?;
        self.bookings.insert(&booking).await?;
        info!(booking_id = %booking.id, tour_id = %booking.tour, user_id = %booking.user, "booking created");
        Ok(booking)
    }

    async fn for_user(&self, user: UserId) -> Result<Vec<Booking>, RepositoryError> {
        let mut bookings: Vec<Booking> = self
            .bookings
            .all()
            .await?
            .into_iter()
            .filter(|b| b.user == user)
            .collect();
        bookings.sort_by_key(|b| (b.created_at, b.id));
        Ok(bookings)
    }

    /// A user's bookings, oldest first, each with its tour resolved.
    pub async fn list_for_user(&self, user: UserId) -> Result<Vec<Value>, RepositoryError> {
        let mut docs = Vec::new();
        for booking in self.for_user(user).await? {
            let mut doc = redacted(&booking, &BOOKING_FIELDS)?;
            if let (Some(tour), Value::Object(map)) = (self.tours.get(booking.tour).await?, &mut doc) {
                map.insert("tour".into(), redacted(&tour, &TOUR_FIELDS)?);
            }
            docs.push(doc);
        }
        Ok(docs)
    }

    /// Distinct public tours a user has booked, in booking order.
    pub async fn tours_booked_by(&self, user: UserId) -> Result<Vec<Tour>, RepositoryError> {
        let mut tours: Vec<Tour> = Vec::new();
        for booking in self.for_user(user).await? {
            if tours.iter().any(|t| t.id == booking.tour) {
                continue;
            }
            if let Some(tour) = self.tours.get(booking.tour).await?.filter(|t| !t.secret) {
                tours.push(tour);
            }
        }
        Ok(tours)
    }
}

#[async_trait]
impl CrudRepository for BookingRepository {
    fn schema(&self) -> &'static FieldSchema {
        &BOOKING_FIELDS
    }

    fn label(&self) -> &'static str {
        "booking"
    }

    async fn create(&self, input: Value) -> Result<Value, RepositoryError> {
        let input: NewBooking =
            serde_json::from_value(input).map_err(|e| DomainError::validation(e.to_string()))?;
        let booking = self.create_booking(input).await?;
        redacted(&booking, &BOOKING_FIELDS)
    }

    async fn find_one(&self, id: Uuid) -> Result<Option<Value>, RepositoryError> {
        self.bookings
            .get(id.into())
            .await?
            .map(|b| redacted(&b, &BOOKING_FIELDS))
            .transpose()
    }

    async fn find_many(&self, query: ListQuery) -> Result<Vec<Value>, RepositoryError> {
        self.bookings.query(&query, &BOOKING_FIELDS).await
    }

    async fn update(&self, id: Uuid, patch: Value) -> Result<Option<Value>, RepositoryError> {
        let Some(current) = self.bookings.get(id.into()).await? else {
            return Ok(None);
        };
        let updated = apply_patch(&current, &patch)?;
        if !self.bookings.replace(&updated).await? {
            return Ok(None);
        }
        redacted(&updated, &BOOKING_FIELDS).map(Some)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        self.bookings.delete(id.into()).await
    }
}
