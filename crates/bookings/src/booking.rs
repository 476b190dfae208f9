use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tourbook_core::{BookingId, DomainError, DomainResult, Entity, TourId, UserId};

fn paid_by_default() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewBooking {
    pub tour: TourId,
    pub user: UserId,
    pub price: f64,
    #[serde(default = "paid_by_default")]
    pub paid: bool,
}

/// A seat purchased on a tour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: BookingId,
    pub tour: TourId,
    pub user: UserId,
    pub price: f64,
    #[serde(default = "paid_by_default")]
    pub paid: bool,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    pub fn create(input: NewBooking, now: DateTime<Utc>) -> DomainResult<Self> {
        let booking = Self {
            id: BookingId::new(),
            tour: input.tour,
            user: input.user,
            price: input.price,
            paid: input.paid,
            created_at: now,
        };
        booking.validate()?;
        Ok(booking)
    }
}

impl Entity for Booking {
    type Id = BookingId;

    const COLLECTION: &'static str = "bookings";
    const LABEL: &'static str = "booking";

    fn id(&self) -> BookingId {
        self.id
    }

    fn validate(&self) -> DomainResult<()> {
        if !self.price.is_finite() || self.price <= 0.0 {
            return Err(DomainError::validation("Booking must have a price"));
        }
        Ok(())
    }
}
