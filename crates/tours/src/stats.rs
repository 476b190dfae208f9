//! Catalog aggregations.

use std::collections::BTreeMap;

use chrono::Datelike;
use serde::Serialize;

use crate::tour::{Difficulty, Tour};

/// Only well-rated tours count towards difficulty statistics.
pub const STATS_MIN_RATING: f64 = 4.5;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyStats {
    /// Upper-cased difficulty, e.g. `"EASY"`.
    pub difficulty: String,
    pub tours_number: usize,
    pub num_ratings: u64,
    pub avg_ratings: f64,
    pub avg_price: f64,
    pub min_price: f64,
    pub max_price: f64,
}

/// Per-difficulty statistics over tours rated at least [`STATS_MIN_RATING`],
/// cheapest average price first.
pub fn difficulty_stats(tours: &[Tour]) -> Vec<DifficultyStats> {
    let mut groups: BTreeMap<Difficulty, Vec<&Tour>> = BTreeMap::new();
    for tour in tours.iter().filter(|t| t.ratings_average >= STATS_MIN_RATING) {
        groups.entry(tour.difficulty).or_default().push(tour);
    }

    let mut stats: Vec<DifficultyStats> = groups
        .into_iter()
        .map(|(difficulty, members)| {
            let n = members.len() as f64;
            DifficultyStats {
                difficulty: difficulty.as_str().to_uppercase(),
                tours_number: members.len(),
                num_ratings: members.iter().map(|t| u64::from(t.ratings_quantity)).sum(),
                avg_ratings: members.iter().map(|t| t.ratings_average).sum::<f64>() / n,
                avg_price: members.iter().map(|t| t.price).sum::<f64>() / n,
                min_price: members.iter().map(|t| t.price).fold(f64::INFINITY, f64::min),
                max_price: members.iter().map(|t| t.price).fold(f64::NEG_INFINITY, f64::max),
            }
        })
        .collect();

    stats.sort_by(|a, b| a.avg_price.total_cmp(&b.avg_price));
    stats
}

/// Tour starts within one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyPlan {
    /// 1 = January.
    pub month: u32,
    pub count: usize,
    /// One entry per start date, so a tour starting twice appears twice.
    pub tours: Vec<String>,
}

/// The month of `year` with the most tour starts. Ties go to the earlier month.
pub fn busiest_month(tours: &[Tour], year: i32) -> Option<MonthlyPlan> {
    let mut months: BTreeMap<u32, Vec<String>> = BTreeMap::new();
    for tour in tours {
        for start in tour.start_dates.iter().filter(|d| d.year() == year) {
            months.entry(start.month()).or_default().push(tour.name.clone());
        }
    }

    months
        .into_iter()
        .map(|(month, tours)| MonthlyPlan {
            month,
            count: tours.len(),
            tours,
        })
        .fold(None, |best: Option<MonthlyPlan>, plan| match best {
            Some(best) if best.count >= plan.count => Some(best),
            _ => Some(plan),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tour::tests::new_tour;
    use chrono::{TimeZone, Utc};

    fn tour(name: &str, difficulty: Difficulty, price: f64, rating: f64, quantity: u32) -> Tour {
        let mut input = new_tour(name);
        input.difficulty = difficulty;
        input.price = price;
        let mut t = Tour::create(input, Utc::now()).unwrap();
        t.set_ratings(quantity, rating);
        t
    }

    #[test]
    fn groups_well_rated_tours_by_difficulty() {
        let tours = vec![
            tour("The Forest Hiker", Difficulty::Easy, 400.0, 4.7, 10),
            tour("The City Wanderer", Difficulty::Easy, 1200.0, 4.6, 4),
            tour("The Snow Adventurer", Difficulty::Difficult, 1000.0, 4.5, 2),
            tour("The Sea Explorer", Difficulty::Medium, 500.0, 4.0, 30),
        ];

        let stats = difficulty_stats(&tours);
        assert_eq!(stats.len(), 2);

        assert_eq!(stats[0].difficulty, "EASY");
        assert_eq!(stats[0].tours_number, 2);
        assert_eq!(stats[0].num_ratings, 14);
        assert_eq!(stats[0].avg_price, 800.0);
        assert_eq!(stats[0].min_price, 400.0);
        assert_eq!(stats[0].max_price, 1200.0);
        assert!((stats[0].avg_ratings - 4.65).abs() < 1e-9);

        assert_eq!(stats[1].difficulty, "DIFFICULT");
        assert_eq!(stats[1].avg_price, 1000.0);
    }

    #[test]
    fn busiest_month_counts_starts_within_the_year() {
        let date = |y, m, d| Utc.with_ymd_and_hms(y, m, d, 9, 0, 0).unwrap();

        let mut hiker = tour("The Forest Hiker", Difficulty::Easy, 400.0, 4.7, 1);
        hiker.start_dates = vec![date(2021, 4, 25), date(2021, 7, 20), date(2022, 7, 5)];
        let mut explorer = tour("The Sea Explorer", Difficulty::Medium, 500.0, 4.8, 1);
        explorer.start_dates = vec![date(2021, 7, 1), date(2021, 12, 1)];

        let plan = busiest_month(&[hiker, explorer], 2021).unwrap();
        assert_eq!(plan.month, 7);
        assert_eq!(plan.count, 2);
        assert_eq!(plan.tours, vec!["The Forest Hiker", "The Sea Explorer"]);
    }

    #[test]
    fn busiest_month_ties_prefer_earlier_month_and_empty_years_are_none() {
        let date = |m| Utc.with_ymd_and_hms(2023, m, 1, 0, 0, 0).unwrap();
        let mut t = tour("The Park Camper", Difficulty::Easy, 400.0, 4.7, 1);
        t.start_dates = vec![date(9), date(3)];
        assert_eq!(busiest_month(std::slice::from_ref(&t), 2023).unwrap().month, 3);
        assert_eq!(busiest_month(&[t], 1999), None);
    }
}
