use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};
use tracing::info;
use uuid::Uuid;

use tourbook_auth::UserProfile;
use tourbook_core::{DistanceUnit, DomainError, GeoPoint, TourId, UserId, apply_patch};
use tourbook_query::{FieldSchema, Filter, FilterValue, ListQuery};
use tourbook_tours::{
    DifficultyStats, MonthlyPlan, NewTour, Tour, TourDistance, busiest_month, difficulty_stats,
    distances_from, tours_within,
};

use super::{
    CrudRepository, MAX_WRITE_ATTEMPTS, ReviewRepository, ReviewView, TOUR_FIELDS, UserRepository,
    redacted, write_contended,
};
use crate::error::RepositoryError;
use crate::store::{Collection, DocumentStore, StoreError};

/// A tour with its guides and reviews resolved, as shown on a tour page.
#[derive(Debug, Clone, PartialEq)]
pub struct TourDetails {
    pub tour: Tour,
    pub guides: Vec<UserProfile>,
    pub reviews: Vec<ReviewView>,
}

impl TourDetails {
    pub fn to_json(&self) -> Result<Value, RepositoryError> {
        let mut doc = redacted(&self.tour, &TOUR_FIELDS)?;
        let guides = serde_json::to_value(&self.guides).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let reviews = self
            .reviews
            .iter()
            .map(ReviewView::to_json)
            .collect::<Result<Vec<_>, _>>()?;
        if let Value::Object(map) = &mut doc {
            map.insert("guides".into(), guides);
            map.insert("reviews".into(), Value::Array(reviews));
            map.insert("durationWeeks".into(), json!(self.tour.duration_weeks()));
        }
        Ok(doc)
    }
}

/// The tour catalog.
///
/// Public reads never return secret tours. Writes address any tour by id so
/// administrators can still maintain hidden ones.
#[derive(Clone)]
pub struct TourRepository {
    tours: Collection<Tour>,
    users: UserRepository,
    reviews: ReviewRepository,
}

impl TourRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            tours: Collection::new(store.clone()),
            users: UserRepository::new(store.clone()),
            reviews: ReviewRepository::new(store),
        }
    }

    pub async fn create_tour(&self, input: NewTour) -> Result<Tour, RepositoryError> {
        self.check_guides(&input.guides).await?;
        let tour = Tour::create(input, Utc::now())?;
        self.insert(&tour).await?;
        Ok(tour)
    }

    /// Store a fully built tour.
    pub async fn insert(&self, tour: &Tour) -> Result<(), RepositoryError> {
        self.tours.insert(tour).await?;
        info!(tour_id = %tour.id, slug = %tour.slug, "tour created");
        Ok(())
    }

    pub async fn find(&self, id: TourId) -> Result<Option<Tour>, RepositoryError> {
        self.tours.get(id).await
    }

    pub async fn find_public(&self, id: TourId) -> Result<Option<Tour>, RepositoryError> {
        Ok(self.tours.get(id).await?.filter(|t| !t.secret))
    }

    pub async fn list_public_tours(&self, query: ListQuery) -> Result<Vec<Value>, RepositoryError> {
        let query = query.and(Filter::ne("secret", FilterValue::Bool(true)));
        self.tours.query(&query, &TOUR_FIELDS).await
    }

    pub async fn public_tours(&self) -> Result<Vec<Tour>, RepositoryError> {
        let mut tours: Vec<Tour> = self
            .tours
            .all()
            .await?
            .into_iter()
            .filter(|t| !t.secret)
            .collect();
        tours.sort_by_key(|t| (t.created_at, t.id));
        Ok(tours)
    }

    pub async fn find_tour_with_guides(&self, id: TourId) -> Result<Option<TourDetails>, RepositoryError> {
        match self.find_public(id).await? {
            Some(tour) => self.details(tour).await.map(Some),
            None => Ok(None),
        }
    }

    pub async fn find_by_slug_with_guides(&self, slug: &str) -> Result<Option<TourDetails>, RepositoryError> {
        match self.tours.find_by_key("slug", slug).await?.filter(|t| !t.secret) {
            Some(tour) => self.details(tour).await.map(Some),
            None => Ok(None),
        }
    }

    /// Public tours starting within `distance` of `center`, redacted.
    pub async fn tours_within(
        &self,
        center: GeoPoint,
        distance: f64,
        unit: DistanceUnit,
    ) -> Result<Vec<Value>, RepositoryError> {
        tours_within(self.public_tours().await?, center, distance, unit)
            .iter()
            .map(|t| redacted(t, &TOUR_FIELDS))
            .collect()
    }

    pub async fn distances(
        &self,
        center: GeoPoint,
        unit: DistanceUnit,
    ) -> Result<Vec<TourDistance>, RepositoryError> {
        Ok(distances_from(&self.public_tours().await?, center, unit))
    }

    pub async fn difficulty_stats(&self) -> Result<Vec<DifficultyStats>, RepositoryError> {
        Ok(difficulty_stats(&self.public_tours().await?))
    }

    pub async fn monthly_plan(&self, year: i32) -> Result<Option<MonthlyPlan>, RepositoryError> {
        Ok(busiest_month(&self.public_tours().await?, year))
    }

    /// Merge `patch` into the stored tour. The patch is re-applied to a fresh
    /// copy whenever a concurrent write (such as a rating recalculation) lands
    /// first, so it never overwrites newer state with a stale copy.
    pub async fn update_tour(&self, id: TourId, patch: &Value) -> Result<Option<Tour>, RepositoryError> {
        for _ in 0..MAX_WRITE_ATTEMPTS {
            let Some((current, revision)) = self.tours.get_revisioned(id).await? else {
                return Ok(None);
            };
            let updated = apply_patch(&current, patch)?;
            if updated.guides != current.guides {
                self.check_guides(&updated.guides).await?;
            }
            if self.tours.replace_if(&updated, revision).await? {
                return Ok(Some(updated));
            }
        }
        Err(write_contended("tour"))
    }

    /// Remove a tour together with its reviews.
    pub async fn delete_tour(&self, id: TourId) -> Result<bool, RepositoryError> {
        if !self.tours.delete(id).await? {
            return Ok(false);
        }
        let reviews = self.reviews.delete_for_tour(id).await?;
        info!(tour_id = %id, reviews, "tour deleted");
        Ok(true)
    }

    async fn details(&self, tour: Tour) -> Result<TourDetails, RepositoryError> {
        let guides = self.users.profiles(&tour.guides).await?;
        let reviews = self.reviews.reviews_for_tour(tour.id).await?;
        Ok(TourDetails {
            tour,
            guides,
            reviews,
        })
    }

    async fn check_guides(&self, guides: &[UserId]) -> Result<(), RepositoryError> {
        for id in guides {
            if self.users.find_active(*id).await?.is_none() {
                return Err(DomainError::validation(format!("No guide found with id {id}")).into());
            }
        }
        Ok(())
    }
}

#[async_trait]
impl CrudRepository for TourRepository {
    fn schema(&self) -> &'static FieldSchema {
        &TOUR_FIELDS
    }

    fn label(&self) -> &'static str {
        "tour"
    }

    async fn create(&self, input: Value) -> Result<Value, RepositoryError> {
        let input: NewTour =
            serde_json::from_value(input).map_err(|e| DomainError::validation(e.to_string()))?;
        let tour = self.create_tour(input).await?;
        redacted(&tour, &TOUR_FIELDS)
    }

    async fn find_one(&self, id: Uuid) -> Result<Option<Value>, RepositoryError> {
        self.find_tour_with_guides(id.into())
            .await?
            .map(|d| d.to_json())
            .transpose()
    }

    async fn find_many(&self, query: ListQuery) -> Result<Vec<Value>, RepositoryError> {
        self.list_public_tours(query).await
    }

    async fn update(&self, id: Uuid, patch: Value) -> Result<Option<Value>, RepositoryError> {
        self.update_tour(id.into(), &patch)
            .await?
            .map(|t| redacted(&t, &TOUR_FIELDS))
            .transpose()
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        self.delete_tour(id.into()).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::repo::fixtures;
    use tourbook_auth::Role;
    use tourbook_reviews::NewReview;

    async fn seeded() -> (TourRepository, UserRepository, ReviewRepository) {
        let store = fixtures::store();
        let repo = TourRepository::new(store.clone());
        for (name, price) in [
            ("The Forest Hiker", 397.0),
            ("The Sea Explorer", 497.0),
            ("The Snow Adventurer", 997.0),
        ] {
            repo.insert(&fixtures::tour(name, price)).await.unwrap();
        }
        (repo, UserRepository::new(store.clone()), ReviewRepository::new(store))
    }

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[tokio::test]
    async fn secret_tours_are_hidden_from_public_reads() {
        let (repo, _, _) = seeded().await;
        let mut hidden = fixtures::tour("The Secret Tour Of Rome", 1497.0);
        hidden.secret = true;
        repo.insert(&hidden).await.unwrap();

        let listed = repo
            .list_public_tours(ListQuery::unfiltered(&TOUR_FIELDS))
            .await
            .unwrap();
        assert_eq!(listed.len(), 3);
        assert!(listed.iter().all(|t| t.get("secret").is_none()));
        assert!(repo.find_public(hidden.id).await.unwrap().is_none());
        assert!(repo.find(hidden.id).await.unwrap().is_some());
        assert!(repo.difficulty_stats().await.unwrap()[0].tours_number == 3);
    }

    #[tokio::test]
    async fn list_query_filters_sorts_and_projects() {
        let (repo, _, _) = seeded().await;
        let query = ListQuery::parse(
            &params(&[("price[gte]", "400"), ("sort", "-price"), ("fields", "name,price")]),
            &TOUR_FIELDS,
        )
        .unwrap();
        let docs = repo.list_public_tours(query).await.unwrap();
        let names: Vec<&str> = docs.iter().map(|d| d["name"].as_str().unwrap()).collect();
        assert_eq!(names, ["The Snow Adventurer", "The Sea Explorer"]);
        assert!(docs[0].get("summary").is_none());
        assert!(docs[0].get("id").is_some());
    }

    #[tokio::test]
    async fn details_resolve_guides_and_reviews() {
        let (repo, users, reviews) = seeded().await;
        let guide = fixtures::user("Lead Guide", "lead@example.io", Role::LeadGuide);
        let reviewer = fixtures::user("Reviewer", "rev@example.io", Role::User);
        users.insert(&guide).await.unwrap();
        users.insert(&reviewer).await.unwrap();

        let mut input: NewTour =
            serde_json::from_value(fixtures::tour_json("The Park Camper", 1497.0)).unwrap();
        input.guides = vec![guide.id];
        let tour = repo.create_tour(input).await.unwrap();
        reviews
            .create_review(NewReview {
                review: "Loved it".into(),
                rating: 5,
                tour: tour.id,
                user: reviewer.id,
            })
            .await
            .unwrap();

        let details = repo.find_by_slug_with_guides("the-park-camper").await.unwrap().unwrap();
        let doc = details.to_json().unwrap();
        assert_eq!(doc["guides"][0]["name"], "Lead Guide");
        assert!(doc["guides"][0].get("password").is_none());
        assert_eq!(doc["reviews"][0]["user"]["name"], "Reviewer");
        assert_eq!(doc["ratingsQuantity"], 1);
        assert!(doc["durationWeeks"].as_f64().is_some());
    }

    #[tokio::test]
    async fn unknown_guide_is_rejected() {
        let (repo, _, _) = seeded().await;
        let mut input: NewTour =
            serde_json::from_value(fixtures::tour_json("The Wine Taster", 1997.0)).unwrap();
        input.guides = vec![UserId::new()];
        assert!(matches!(
            repo.create_tour(input).await.unwrap_err(),
            RepositoryError::Domain(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn deleting_a_tour_removes_its_reviews() {
        let (repo, users, reviews) = seeded().await;
        let reviewer = fixtures::user("Reviewer", "rev@example.io", Role::User);
        users.insert(&reviewer).await.unwrap();
        let tour = repo.public_tours().await.unwrap().remove(0);
        let review = reviews
            .create_review(NewReview {
                review: "Fine".into(),
                rating: 3,
                tour: tour.id,
                user: reviewer.id,
            })
            .await
            .unwrap();

        assert!(repo.delete_tour(tour.id).await.unwrap());
        assert!(!repo.delete_tour(tour.id).await.unwrap());
        assert!(reviews.find(review.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_cannot_touch_ratings_and_rederives_slug() {
        let (repo, _, _) = seeded().await;
        let tour = repo.public_tours().await.unwrap().remove(0);
        let updated = repo
            .update_tour(
                tour.id,
                &json!({ "name": "The Renamed Hiker", "ratingsAverage": 1.0 }),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.slug, "the-renamed-hiker");
        assert_eq!(updated.ratings_average, tour.ratings_average);
    }

    #[tokio::test]
    async fn geo_queries_use_start_locations() {
        let (repo, _, _) = seeded().await;
        let banff = GeoPoint::new(-115.570154, 51.178456);
        let near = repo.tours_within(banff, 100.0, DistanceUnit::Mi).await.unwrap();
        assert_eq!(near.len(), 3);
        let far = GeoPoint::new(-80.185942, 25.774772);
        assert!(repo.tours_within(far, 100.0, DistanceUnit::Mi).await.unwrap().is_empty());

        let distances = repo.distances(far, DistanceUnit::Km).await.unwrap();
        assert_eq!(distances.len(), 3);
        assert!(distances[0].distance > 3000.0);
    }
}
