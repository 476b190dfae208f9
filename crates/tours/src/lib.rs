//! `tourbook-tours`: the tour catalog domain.
//!
//! Tours, their validation rules and the read-side computations over them
//! (difficulty statistics, busiest month, geospatial selection). All functions
//! here are pure; loading tours is the repository's job.

pub mod search;
pub mod stats;
pub mod tour;

pub use search::{TourDistance, distances_from, tours_within};
pub use stats::{DifficultyStats, MonthlyPlan, STATS_MIN_RATING, busiest_month, difficulty_stats};
pub use tour::{Difficulty, GeoJsonKind, Location, NewTour, Tour, slugify};
