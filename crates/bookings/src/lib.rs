//! Bookings and the checkout request that precedes them.

pub mod booking;
pub mod checkout;

pub use booking::{Booking, NewBooking};
pub use checkout::{CheckoutLineItem, CheckoutSessionRequest};
