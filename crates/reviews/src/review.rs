use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tourbook_core::{DomainError, DomainResult, Entity, ReviewId, TourId, UniqueKey, UserId};

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

#[derive(Debug, Clone, Deserialize)]
pub struct NewReview {
    pub review: String,
    pub rating: u8,
    pub tour: TourId,
    pub user: UserId,
}

/// A user's review of a tour. One per (tour, user) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub review: String,
    pub rating: u8,
    pub tour: TourId,
    pub user: UserId,
    pub created_at: DateTime<Utc>,
}

impl Review {
    pub fn create(input: NewReview, now: DateTime<Utc>) -> DomainResult<Self> {
        Self::create_with_id(ReviewId::new(), input, now)
    }

    pub fn create_with_id(id: ReviewId, input: NewReview, now: DateTime<Utc>) -> DomainResult<Self> {
        let mut review = Self {
            id,
            review: input.review,
            rating: input.rating,
            tour: input.tour,
            user: input.user,
            created_at: now,
        };
        review.normalize();
        review.validate()?;
        Ok(review)
    }

    pub fn is_written_by(&self, user: UserId) -> bool {
        self.user == user
    }
}

impl Entity for Review {
    type Id = ReviewId;

    const COLLECTION: &'static str = "reviews";
    const LABEL: &'static str = "review";
    // the pair is the review's identity for uniqueness, so it never moves
    const IMMUTABLE_FIELDS: &'static [&'static str] = &["createdAt", "tour", "user"];

    fn id(&self) -> ReviewId {
        self.id
    }

    fn validate(&self) -> DomainResult<()> {
        let mut problems = Vec::new();
        if self.review.is_empty() {
            problems.push("Review can not be empty".to_string());
        }
        if !(MIN_RATING..=MAX_RATING).contains(&self.rating) {
            problems.push(format!(
                "Rating must be between {MIN_RATING} and {MAX_RATING}"
            ));
        }
        DomainError::check(problems)
    }

    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![UniqueKey::new("review", format!("{}:{}", self.tour, self.user))]
    }

    fn normalize(&mut self) {
        self.review = self.review.trim().to_string();
    }
}
