use serde::Serialize;

/// Count and mean of a tour's review ratings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RatingSummary {
    pub quantity: u32,
    pub average: f64,
}

impl RatingSummary {
    /// Average reported when a tour has no reviews.
    pub const DEFAULT_AVERAGE: f64 = 4.5;

    pub fn from_ratings(ratings: impl IntoIterator<Item = u8>) -> Self {
        let (count, total) = ratings
            .into_iter()
            .fold((0u32, 0u64), |(n, sum), r| (n + 1, sum + u64::from(r)));

        if count == 0 {
            Self {
                quantity: 0,
                average: Self::DEFAULT_AVERAGE,
            }
        } else {
            Self {
                quantity: count,
                average: total as f64 / f64::from(count),
            }
        }
    }
}
