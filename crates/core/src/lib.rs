//! `tourbook-core`: shared domain primitives.
//!
//! Identifiers, the domain error model, the document `Entity` contract and the
//! spherical geometry used by tour search. Nothing in here knows about HTTP or
//! storage.

pub mod entity;
pub mod error;
pub mod geo;
pub mod id;
pub mod patch;

pub use entity::{Entity, UniqueKey};
pub use error::{DomainError, DomainResult};
pub use geo::{DistanceUnit, GeoPoint};
pub use id::{BookingId, ReviewId, TourId, UserId};
pub use patch::apply_patch;
