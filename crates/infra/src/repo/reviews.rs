use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use tourbook_core::{DomainError, ReviewId, TourId, UserId, apply_patch};
use tourbook_query::{FieldSchema, Filter, FilterValue, ListQuery};
use tourbook_reviews::{NewReview, RatingSummary, Review};
use tourbook_tours::Tour;

use super::{
    CrudRepository, MAX_WRITE_ATTEMPTS, REVIEW_FIELDS, UserRepository, redacted, write_contended,
};
use crate::error::RepositoryError;
use crate::store::{Collection, DocumentStore};

/// The part of a review author's profile shown next to the review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewAuthor {
    pub id: UserId,
    pub name: String,
    pub photo: String,
}

/// A review with its author resolved. `user` is `None` when the author's
/// account no longer exists.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewView {
    pub review: Review,
    pub user: Option<ReviewAuthor>,
}

impl ReviewView {
    pub fn to_json(&self) -> Result<Value, RepositoryError> {
        let mut doc = redacted(&self.review, &REVIEW_FIELDS)?;
        if let Value::Object(map) = &mut doc {
            let author = serde_json::to_value(&self.user)
                .map_err(|e| crate::store::StoreError::Corrupt(e.to_string()))?;
            map.insert("user".into(), author);
        }
        Ok(doc)
    }
}

/// Reviews and the tour rating aggregate they maintain.
///
/// Every write that changes a tour's set of reviews recomputes that tour's
/// `ratingsQuantity` and `ratingsAverage`.
#[derive(Clone)]
pub struct ReviewRepository {
    reviews: Collection<Review>,
    tours: Collection<Tour>,
    users: UserRepository,
}

impl ReviewRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            reviews: Collection::new(store.clone()),
            tours: Collection::new(store.clone()),
            users: UserRepository::new(store),
        }
    }

    /// Secret tours cannot be reviewed; they read as missing.
    pub async fn create_review(&self, input: NewReview) -> Result<Review, RepositoryError> {
        if self.tours.get(input.tour).await?.is_none_or(|t| t.secret) {
            return Err(DomainError::not_found("tour").into());
        }
        if self.users.find_active(input.user).await?.is_none() {
            return Err(DomainError::not_found("user").into());
        }

        let review = Review::create(input, Utc::now())?;
        self.reviews.insert(&review).await?;
        info!(review_id = %review.id, tour_id = %review.tour, "review created");
        self.recalculate_tour_rating(review.tour).await?;
        Ok(review)
    }

    /// Store a review as-is, without touching the tour aggregate.
    pub async fn insert(&self, review: &Review) -> Result<(), RepositoryError> {
        self.reviews.insert(review).await
    }

    pub async fn find(&self, id: ReviewId) -> Result<Option<Review>, RepositoryError> {
        self.reviews.get(id).await
    }

    pub async fn update_review(
        &self,
        id: ReviewId,
        patch: &Value,
    ) -> Result<Option<Review>, RepositoryError> {
        let Some(current) = self.reviews.get(id).await? else {
            return Ok(None);
        };
        let updated = apply_patch(&current, patch)?;
        if !self.reviews.replace(&updated).await? {
            return Ok(None);
        }
        if updated.tour != current.tour {
            self.recalculate_tour_rating(current.tour).await?;
        }
        self.recalculate_tour_rating(updated.tour).await?;
        Ok(Some(updated))
    }

    pub async fn delete_review(&self, id: ReviewId) -> Result<bool, RepositoryError> {
        let Some(review) = self.reviews.get(id).await? else {
            return Ok(false);
        };
        if !self.reviews.delete(id).await? {
            return Ok(false);
        }
        self.recalculate_tour_rating(review.tour).await?;
        Ok(true)
    }

    /// Run a list query and resolve each review's author.
    pub async fn list(&self, query: ListQuery) -> Result<Vec<Value>, RepositoryError> {
        let mut docs = self.reviews.query(&query, &REVIEW_FIELDS).await?;
        for doc in &mut docs {
            self.populate_author(doc).await?;
        }
        Ok(docs)
    }

    /// Reviews of one tour, oldest first, with authors.
    pub async fn reviews_for_tour(&self, tour: TourId) -> Result<Vec<ReviewView>, RepositoryError> {
        let mut reviews: Vec<Review> = self
            .reviews
            .all()
            .await?
            .into_iter()
            .filter(|r| r.tour == tour)
            .collect();
        reviews.sort_by_key(|r| (r.created_at, r.id));

        let mut views = Vec::with_capacity(reviews.len());
        for review in reviews {
            let user = self.author(review.user).await?;
            views.push(ReviewView { review, user });
        }
        Ok(views)
    }

    /// Remove every review of a tour. Returns how many were removed.
    pub async fn delete_for_tour(&self, tour: TourId) -> Result<usize, RepositoryError> {
        let mut removed = 0;
        for review in self.reviews.all().await?.into_iter().filter(|r| r.tour == tour) {
            if self.reviews.delete(review.id).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Recompute a tour's rating aggregate from its current reviews.
    /// `None` when the tour no longer exists.
    pub async fn recalculate_tour_rating(
        &self,
        tour_id: TourId,
    ) -> Result<Option<RatingSummary>, RepositoryError> {
        // The scan must follow the revision read, so a conditional write that
        // lands has seen every review committed before it.
        for _ in 0..MAX_WRITE_ATTEMPTS {
            let Some((mut tour, revision)) = self.tours.get_revisioned(tour_id).await? else {
                return Ok(None);
            };

            let reviews = self.reviews.all().await?;
            let summary = RatingSummary::from_ratings(
                reviews.iter().filter(|r| r.tour == tour_id).map(|r| r.rating),
            );

            tour.set_ratings(summary.quantity, summary.average);
            if self.tours.replace_if(&tour, revision).await? {
                debug!(
                    tour_id = %tour_id,
                    quantity = summary.quantity,
                    average = tour.ratings_average,
                    "tour rating recalculated"
                );
                return Ok(Some(summary));
            }
        }
        Err(write_contended("tour"))
    }

    async fn author(&self, user: UserId) -> Result<Option<ReviewAuthor>, RepositoryError> {
        Ok(self.users.find_active(user).await?.map(|u| ReviewAuthor {
            id: u.id,
            name: u.name,
            photo: u.photo,
        }))
    }

    async fn populate_author(&self, doc: &mut Value) -> Result<(), RepositoryError> {
        let Some(user_id) = doc
            .get("user")
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<UserId>().ok())
        else {
            return Ok(());
        };
        let author = serde_json::to_value(self.author(user_id).await?)
            .map_err(|e| crate::store::StoreError::Corrupt(e.to_string()))?;
        if let Value::Object(map) = doc {
            map.insert("user".into(), author);
        }
        Ok(())
    }
}

#[async_trait]
impl CrudRepository for ReviewRepository {
    fn schema(&self) -> &'static FieldSchema {
        &REVIEW_FIELDS
    }

    fn label(&self) -> &'static str {
        "review"
    }

    async fn create(&self, input: Value) -> Result<Value, RepositoryError> {
        let input: NewReview =
            serde_json::from_value(input).map_err(|e| DomainError::validation(e.to_string()))?;
        let review = self.create_review(input).await?;
        redacted(&review, &REVIEW_FIELDS)
    }

    async fn find_one(&self, id: Uuid) -> Result<Option<Value>, RepositoryError> {
        let Some(review) = self.find(id.into()).await? else {
            return Ok(None);
        };
        let user = self.author(review.user).await?;
        ReviewView { review, user }.to_json().map(Some)
    }

    async fn find_many(&self, query: ListQuery) -> Result<Vec<Value>, RepositoryError> {
        self.list(query).await
    }

    async fn update(&self, id: Uuid, patch: Value) -> Result<Option<Value>, RepositoryError> {
        self.update_review(id.into(), &patch)
            .await?
            .map(|r| redacted(&r, &REVIEW_FIELDS))
            .transpose()
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        self.delete_review(id.into()).await
    }
}

/// Scope a review listing to one tour.
pub fn scoped_to_tour(query: ListQuery, tour: TourId) -> ListQuery {
    query.and(Filter::eq("tour", FilterValue::Id(tour.into())))
}
