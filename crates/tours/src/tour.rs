use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tourbook_core::{DomainError, DomainResult, Entity, GeoPoint, TourId, UniqueKey, UserId};

pub const NAME_MIN_LEN: usize = 10;
pub const NAME_MAX_LEN: usize = 40;
/// Average shown for a tour nobody has reviewed yet.
pub const DEFAULT_RATINGS_AVERAGE: f64 = 4.5;

// ─────────────────────────────────────────────────────────────────────────────
// Value types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Difficult,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Difficult => "difficult",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GeoJsonKind {
    #[default]
    Point,
}

/// A GeoJSON point with a label. Coordinates are `[lng, lat]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(rename = "type", default)]
    pub kind: GeoJsonKind,
    pub coordinates: [f64; 2],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Itinerary day, for waypoints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<u32>,
}

impl Location {
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.coordinates[0], self.coordinates[1])
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tour
// ─────────────────────────────────────────────────────────────────────────────

/// Fields a client supplies when creating a tour.
///
/// Ratings are absent on purpose: they only ever come from reviews.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTour {
    pub name: String,
    pub duration: u32,
    #[serde(default)]
    pub max_group_size: Option<u32>,
    pub difficulty: Difficulty,
    pub price: f64,
    #[serde(default)]
    pub price_discount: Option<f64>,
    pub summary: String,
    #[serde(default)]
    pub description: Option<String>,
    pub image_cover: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub start_dates: Vec<DateTime<Utc>>,
    #[serde(default)]
    pub secret: bool,
    #[serde(default)]
    pub start_location: Option<Location>,
    #[serde(default)]
    pub locations: Vec<Location>,
    #[serde(default)]
    pub guides: Vec<UserId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tour {
    pub id: TourId,
    pub name: String,
    pub slug: String,
    pub duration: u32,
    #[serde(default)]
    pub max_group_size: Option<u32>,
    pub difficulty: Difficulty,
    pub ratings_average: f64,
    pub ratings_quantity: u32,
    pub price: f64,
    #[serde(default)]
    pub price_discount: Option<f64>,
    pub summary: String,
    #[serde(default)]
    pub description: Option<String>,
    pub image_cover: String,
    #[serde(default)]
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub start_dates: Vec<DateTime<Utc>>,
    /// Secret tours never show up in public listings.
    #[serde(default)]
    pub secret: bool,
    #[serde(default)]
    pub start_location: Option<Location>,
    #[serde(default)]
    pub locations: Vec<Location>,
    #[serde(default)]
    pub guides: Vec<UserId>,
}

impl Tour {
    pub fn create(input: NewTour, now: DateTime<Utc>) -> DomainResult<Self> {
        Self::create_with_id(TourId::new(), input, now)
    }

    pub fn create_with_id(id: TourId, input: NewTour, now: DateTime<Utc>) -> DomainResult<Self> {
        let mut tour = Self {
            id,
            slug: String::new(),
            name: input.name,
            duration: input.duration,
            max_group_size: input.max_group_size,
            difficulty: input.difficulty,
            ratings_average: DEFAULT_RATINGS_AVERAGE,
            ratings_quantity: 0,
            price: input.price,
            price_discount: input.price_discount,
            summary: input.summary,
            description: input.description,
            image_cover: input.image_cover,
            images: input.images,
            created_at: now,
            start_dates: input.start_dates,
            secret: input.secret,
            start_location: input.start_location,
            locations: input.locations,
            guides: input.guides,
        };
        tour.normalize();
        tour.validate()?;
        Ok(tour)
    }

    pub fn duration_weeks(&self) -> f64 {
        f64::from(self.duration) / 7.0
    }

    /// Overwrite the rating aggregate. Only review bookkeeping calls this.
    pub fn set_ratings(&mut self, quantity: u32, average: f64) {
        self.ratings_quantity = quantity;
        self.ratings_average = round_to_tenth(average);
    }
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

impl Entity for Tour {
    type Id = TourId;

    const COLLECTION: &'static str = "tours";
    const LABEL: &'static str = "tour";
    const IMMUTABLE_FIELDS: &'static [&'static str] =
        &["createdAt", "slug", "ratingsAverage", "ratingsQuantity"];

    fn id(&self) -> TourId {
        self.id
    }

    fn validate(&self) -> DomainResult<()> {
        let mut problems = Vec::new();

        let name_len = self.name.chars().count();
        if name_len < NAME_MIN_LEN {
            problems.push(format!(
                "A tour name must have at least {NAME_MIN_LEN} characters"
            ));
        }
        if name_len > NAME_MAX_LEN {
            problems.push(format!(
                "A tour name must have at most {NAME_MAX_LEN} characters"
            ));
        }
        if self.duration == 0 {
            problems.push("A tour must last at least one day".to_string());
        }
        if self.max_group_size == Some(0) {
            problems.push("A tour group must allow at least one person".to_string());
        }
        if !self.price.is_finite() || self.price <= 0.0 {
            problems.push("A tour must have a positive price".to_string());
        }
        if let Some(discount) = self.price_discount {
            if !discount.is_finite() || discount < 0.0 || discount >= self.price {
                problems.push(format!(
                    "Discount price ({discount}) should be below the regular price"
                ));
            }
        }
        if !(1.0..=5.0).contains(&self.ratings_average) {
            problems.push("Rating must be between 1.0 and 5.0".to_string());
        }
        if self.summary.trim().is_empty() {
            problems.push("A tour must have a summary".to_string());
        }
        if self.image_cover.trim().is_empty() {
            problems.push("A tour must have a cover image".to_string());
        }
        let bad_location = self
            .start_location
            .iter()
            .chain(&self.locations)
            .any(|loc| !loc.point().is_valid());
        if bad_location {
            problems.push("Locations must use [longitude, latitude] coordinates".to_string());
        }

        DomainError::check(problems)
    }

    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![
            UniqueKey::new("name", self.name.clone()),
            UniqueKey::new("slug", self.slug.clone()),
        ]
    }

    fn normalize(&mut self) {
        self.name = self.name.trim().to_string();
        self.summary = self.summary.trim().to_string();
        self.slug = slugify(&self.name);
        self.ratings_average = round_to_tenth(self.ratings_average);
    }
}

/// URL-safe lower-case slug: ASCII alphanumerics joined by single dashes.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;
    use tourbook_core::apply_patch;

    pub(crate) fn new_tour(name: &str) -> NewTour {
        NewTour {
            name: name.to_string(),
            duration: 5,
            max_group_size: Some(25),
            difficulty: Difficulty::Easy,
            price: 397.0,
            price_discount: None,
            summary: "Breathtaking hike through the Canadian Banff National Park".to_string(),
            description: None,
            image_cover: "tour-1-cover.jpg".to_string(),
            images: vec![],
            start_dates: vec![],
            secret: false,
            start_location: None,
            locations: vec![],
            guides: vec![],
        }
    }

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn create_derives_slug_and_default_ratings() {
        let tour = Tour::create(new_tour("  The Forest Hiker "), now()).unwrap();
        assert_eq!(tour.name, "The Forest Hiker");
        assert_eq!(tour.slug, "the-forest-hiker");
        assert_eq!(tour.ratings_average, 4.5);
        assert_eq!(tour.ratings_quantity, 0);
        assert!((tour.duration_weeks() - 5.0 / 7.0).abs() < f64::EPSILON);
    }

    #[test]
    fn name_length_bounds() {
        assert!(Tour::create(new_tour("Too short"), now()).is_err());
        assert!(Tour::create(new_tour("Exactly 10"), now()).is_ok());
        assert!(Tour::create(new_tour(&"x".repeat(41)), now()).is_err());
    }

    #[test]
    fn discount_must_be_below_price() {
        let mut input = new_tour("The Sea Explorer");
        input.price_discount = Some(397.0);
        let err = Tour::create(input, now()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid input. Discount price (397) should be below the regular price"
        );
    }

    #[test]
    fn all_problems_reported_together() {
        let mut input = new_tour("Short");
        input.summary = " ".to_string();
        input.max_group_size = Some(0);
        let DomainError::Validation(msg) = Tour::create(input, now()).unwrap_err() else {
            panic!("expected validation error");
        };
        assert!(msg.contains("at least 10 characters"));
        assert!(msg.contains("summary"));
        assert!(msg.contains("at least one person"));
    }

    #[test]
    fn difficulty_is_a_closed_set() {
        let err = serde_json::from_value::<Difficulty>(json!("extreme"));
        assert!(err.is_err());
    }

    #[test]
    fn locations_serialize_as_geojson() {
        let loc = Location {
            kind: GeoJsonKind::Point,
            coordinates: [-80.185942, 25.774772],
            address: None,
            description: Some("Miami".into()),
            day: Some(1),
        };
        let json = serde_json::to_value(&loc).unwrap();
        assert_eq!(json["type"], "Point");
        assert_eq!(json["coordinates"], json!([-80.185942, 25.774772]));
        assert_eq!(loc.point(), GeoPoint::new(-80.185942, 25.774772));
    }

    #[test]
    fn invalid_coordinates_rejected() {
        let mut input = new_tour("The Park Camper");
        input.start_location = Some(Location {
            kind: GeoJsonKind::Point,
            coordinates: [25.0, -200.0],
            address: None,
            description: None,
            day: None,
        });
        assert!(Tour::create(input, now()).is_err());
    }

    #[test]
    fn patch_recomputes_slug_and_keeps_ratings() {
        let mut tour = Tour::create(new_tour("The Forest Hiker"), now()).unwrap();
        tour.set_ratings(3, 4.666);
        let patched = apply_patch(
            &tour,
            &json!({ "name": "The Forest Wanderer", "ratingsAverage": 1.0, "ratingsQuantity": 99 }),
        )
        .unwrap();
        assert_eq!(patched.slug, "the-forest-wanderer");
        assert_eq!(patched.ratings_average, 4.7);
        assert_eq!(patched.ratings_quantity, 3);
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("The  Snow -- Adventurer!"), "the-snow-adventurer");
        assert_eq!(slugify("¡Hola Mundo!"), "hola-mundo");
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 500, .. ProptestConfig::default() })]

        #[test]
        fn slug_is_url_safe(name in "\\PC{0,60}") {
            let slug = slugify(&name);
            prop_assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
            prop_assert!(!slug.starts_with('-') && !slug.ends_with('-'));
            prop_assert!(!slug.contains("--"));
        }
    }
}
