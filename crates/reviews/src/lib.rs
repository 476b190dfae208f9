//! Reviews and the rating aggregate they drive.

pub mod rating;
pub mod review;

pub use rating::RatingSummary;
pub use review::{NewReview, Review};
