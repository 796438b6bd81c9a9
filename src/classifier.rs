//! Threshold-based category assignment.

use indexmap::IndexMap;
use serde::Serialize;

use crate::categories::Category;
use crate::extractor::TripId;
use crate::scorer::FeatureScores;

/// Passing categories of one trip, with scores rounded to 3 decimals.
pub type TripCategories = IndexMap<Category, f64>;

/// Categories assigned to every scored trip.
///
/// Trips that pass no threshold are present with an empty mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Categorization {
    pub trips: IndexMap<TripId, TripCategories>,
}

impl Categorization {
    pub fn len(&self) -> usize {
        self.trips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trips.is_empty()
    }

    pub fn get(&self, trip_id: &str) -> Option<&TripCategories> {
        self.trips.get(trip_id)
    }
}

/// Rounds a score to 3 decimal places.
pub fn round_score(score: f64) -> f64 {
    (score * 1000.0).round() / 1000.0
}

/// Keeps, for every trip, the categories whose raw score reaches the
/// category threshold.
///
/// The comparison uses the unrounded score; only the retained value is rounded.
pub fn classify(scores: &FeatureScores) -> Categorization {
    let mut trips: IndexMap<TripId, TripCategories> = scores
        .keys()
        .map(|trip_id| (trip_id.clone(), TripCategories::new()))
        .collect();

    for category in Category::ALL {
        let threshold = category.threshold();
        for (trip_id, features) in scores {
            let score = features[category.index()];
            if score >= threshold {
                if let Some(categories) = trips.get_mut(trip_id) {
                    categories.insert(category, round_score(score));
                }
            }
        }
    }

    Categorization { trips }
}
