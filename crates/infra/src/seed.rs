//! Development data import.
//!
//! Reads `users.json`, `tours.json` and `reviews.json` from a directory and
//! loads them in dependency order. Documents that already exist are skipped,
//! so importing twice is harmless.

use std::path::Path;

use anyhow::Context;
use chrono::Utc;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use tourbook_auth::{PasswordHasher, Role, User};
use tourbook_core::{DomainError, ReviewId, TourId, UserId};
use tourbook_reviews::{NewReview, Review};
use tourbook_tours::{NewTour, Tour};

use crate::error::RepositoryError;
use crate::repo::{ReviewRepository, TourRepository, UserRepository};

#[derive(Debug, Deserialize)]
struct SeedUser {
    id: UserId,
    name: String,
    email: String,
    #[serde(default)]
    role: Role,
    #[serde(default)]
    photo: Option<String>,
    /// Plain text; hashed on import.
    password: String,
}

#[derive(Debug, Deserialize)]
struct SeedTour {
    id: TourId,
    #[serde(flatten)]
    tour: NewTour,
}

#[derive(Debug, Deserialize)]
struct SeedReview {
    #[serde(default)]
    id: Option<ReviewId>,
    #[serde(flatten)]
    review: NewReview,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub users: usize,
    pub tours: usize,
    pub reviews: usize,
    pub skipped: usize,
}

async fn read_json<T: DeserializeOwned>(dir: &Path, file: &str) -> anyhow::Result<Vec<T>> {
    let path = dir.join(file);
    let raw = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

/// `Ok(false)` when the document was already present.
fn inserted(result: Result<(), RepositoryError>) -> anyhow::Result<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(RepositoryError::Domain(DomainError::Duplicate { field, value })) => {
            debug!(%field, %value, "seed document already present");
            Ok(false)
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn import_dir(
    dir: &Path,
    users: &UserRepository,
    tours: &TourRepository,
    reviews: &ReviewRepository,
    hasher: PasswordHasher,
) -> anyhow::Result<SeedReport> {
    let mut report = SeedReport::default();
    let now = Utc::now();

    for seed in read_json::<SeedUser>(dir, "users.json").await? {
        let hash = hasher.hash(seed.password).await?;
        let mut user = User::register(seed.name, seed.email, hash, now)
            .with_context(|| format!("seed user {}", seed.id))?
            .with_role(seed.role);
        user.id = seed.id;
        if let Some(photo) = seed.photo {
            user.photo = photo;
        }
        if inserted(users.insert(&user).await)? {
            report.users += 1;
        } else {
            report.skipped += 1;
        }
    }

    let mut tour_ids = Vec::new();
    for seed in read_json::<SeedTour>(dir, "tours.json").await? {
        let tour = Tour::create_with_id(seed.id, seed.tour, now)
            .with_context(|| format!("seed tour {}", seed.id))?;
        tour_ids.push(tour.id);
        if inserted(tours.insert(&tour).await)? {
            report.tours += 1;
        } else {
            report.skipped += 1;
        }
    }

    for seed in read_json::<SeedReview>(dir, "reviews.json").await? {
        let id = seed.id.unwrap_or_default();
        let review = Review::create_with_id(id, seed.review, now)
            .with_context(|| format!("seed review {id}"))?;
        if inserted(reviews.insert(&review).await)? {
            report.reviews += 1;
        } else {
            report.skipped += 1;
        }
    }

    for id in tour_ids {
        reviews.recalculate_tour_rating(id).await?;
    }

    info!(
        users = report.users,
        tours = report.tours,
        reviews = report.reviews,
        skipped = report.skipped,
        dir = %dir.display(),
        "seed data imported"
    );
    Ok(report)
}
