//! Review store: append-only list persisted under the `reviews` key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::db::DbState;
use crate::{read_local_json_array, write_local_json};

pub(crate) const REVIEWS_KEY: &str = "reviews";

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub reviewer: String,
    pub rating: u8,
    pub message: String,
    #[serde(alias = "created_at")]
    pub created_at: DateTime<Utc>,
}

impl Review {
    /// Build a review from raw input: reviewer and message are trimmed and
    /// must be non-empty, rating must lie in `MIN_RATING..=MAX_RATING`.
    pub fn checked(
        reviewer: &str,
        rating: i64,
        message: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ReviewRejection> {
        let reviewer = reviewer.trim();
        let message = message.trim();
        if reviewer.is_empty() {
            return Err(ReviewRejection::EmptyReviewer);
        }
        if message.is_empty() {
            return Err(ReviewRejection::EmptyMessage);
        }
        let rating = u8::try_from(rating)
            .ok()
            .filter(|r| (MIN_RATING..=MAX_RATING).contains(r))
            .ok_or(ReviewRejection::RatingOutOfRange)?;
        Ok(Self {
            reviewer: reviewer.to_string(),
            rating,
            message: message.to_string(),
            created_at,
        })
    }
}

/// Why a review submission was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewRejection {
    EmptyReviewer,
    EmptyMessage,
    RatingOutOfRange,
}

impl ReviewRejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmptyReviewer => "Reviewer name is required",
            Self::EmptyMessage => "Review message is required",
            Self::RatingOutOfRange => "Rating must be between 1 and 5",
        }
    }
}

/// Reviews in the order they were written (oldest first).
#[derive(Debug, Clone, Default)]
pub struct ReviewStore {
    reviews: Vec<Review>,
}

impl ReviewStore {
    pub fn new(reviews: Vec<Review>) -> Self {
        Self { reviews }
    }

    /// Validate and append a review stamped with the current time.
    pub fn append(
        &mut self,
        reviewer: &str,
        rating: i64,
        message: &str,
    ) -> Result<&Review, ReviewRejection> {
        self.append_at(reviewer, rating, message, Utc::now())
    }

    pub fn append_at(
        &mut self,
        reviewer: &str,
        rating: i64,
        message: &str,
        created_at: DateTime<Utc>,
    ) -> Result<&Review, ReviewRejection> {
        let review = Review::checked(reviewer, rating, message, created_at)?;
        self.reviews.push(review);
        Ok(&self.reviews[self.reviews.len() - 1])
    }

    pub fn len(&self) -> usize {
        self.reviews.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reviews.is_empty()
    }

    /// Reviews newest first, for display. Append order decides, not the
    /// stored timestamps.
    pub fn most_recent_first(&self) -> Vec<&Review> {
        self.reviews.iter().rev().collect()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.reviews).unwrap_or_else(|_| serde_json::json!([]))
    }
}

/// Restore reviews from local storage. Records that do not parse, or that a
/// fresh submission would be refused for, are skipped.
pub fn load_reviews(db: &DbState) -> ReviewStore {
    let raw = match read_local_json_array(db, REVIEWS_KEY) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %e, "review restore failed, starting empty");
            return ReviewStore::default();
        }
    };
    let reviews = raw
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<Review>(value) {
            Ok(stored) => match Review::checked(
                &stored.reviewer,
                i64::from(stored.rating),
                &stored.message,
                stored.created_at,
            ) {
                Ok(review) => Some(review),
                Err(rejection) => {
                    warn!(reason = rejection.as_str(), "skipping invalid stored review");
                    None
                }
            },
            Err(e) => {
                warn!(error = %e, "skipping malformed stored review");
                None
            }
        })
        .collect();
    ReviewStore::new(reviews)
}

pub fn save_reviews(db: &DbState, store: &ReviewStore) -> Result<(), String> {
    write_local_json(db, REVIEWS_KEY, &store.to_json())?;
    debug!(count = store.len(), "reviews persisted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_760_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn rejects_invalid_fields() {
        let mut store = ReviewStore::default();
        assert_eq!(
            store.append("Ana", 0, "Great bread").unwrap_err(),
            ReviewRejection::RatingOutOfRange
        );
        assert_eq!(
            store.append("Ana", 6, "Great bread").unwrap_err(),
            ReviewRejection::RatingOutOfRange
        );
        assert_eq!(
            store.append("   ", 5, "Great bread").unwrap_err(),
            ReviewRejection::EmptyReviewer
        );
        assert_eq!(
            store.append("Ana", 5, "\n\t ").unwrap_err(),
            ReviewRejection::EmptyMessage
        );
        assert!(store.is_empty());
    }

    #[test]
    fn accepts_and_trims() {
        let mut store = ReviewStore::default();
        let review = store.append("  Ana ", 5, " Great bread ").unwrap();
        assert_eq!(review.reviewer, "Ana");
        assert_eq!(review.message, "Great bread");
        assert_eq!(review.rating, 5);
        assert_eq!(store.len(), 1);
    }

    fn names(store: &ReviewStore) -> Vec<&str> {
        store
            .most_recent_first()
            .iter()
            .map(|r| r.reviewer.as_str())
            .collect()
    }

    #[test]
    fn newest_first_ordering() {
        let mut store = ReviewStore::default();
        store.append_at("Old", 3, "first", at(0)).unwrap();
        store.append_at("Mid", 4, "second", at(10)).unwrap();
        store.append_at("Same", 4, "third", at(10)).unwrap();
        assert_eq!(names(&store), vec!["Same", "Mid", "Old"]);
    }

    #[test]
    fn latest_append_leads_despite_future_timestamp() {
        let mut store = ReviewStore::default();
        store
            .append_at("Old", 4, "from a fast clock", Utc::now() + chrono::Duration::hours(1))
            .unwrap();
        store.append("Ana", 5, "Great bread").unwrap();
        assert_eq!(names(&store), vec!["Ana", "Old"]);
    }

    #[test]
    fn persist_round_trip() {
        let db = db::init_in_memory();
        let mut store = ReviewStore::default();
        store.append_at("Ana", 5, "Great bread", at(5)).unwrap();
        save_reviews(&db, &store).unwrap();

        let restored = load_reviews(&db);
        assert_eq!(restored.len(), 1);
        let review = restored.most_recent_first()[0].clone();
        assert_eq!(review.reviewer, "Ana");
        assert_eq!(review.created_at, at(5));
    }

    #[test]
    fn load_skips_malformed_records() {
        let db = db::init_in_memory();
        write_local_json(
            &db,
            REVIEWS_KEY,
            &serde_json::json!([
                {"reviewer": "Ana", "rating": 5, "message": "ok", "createdAt": "2026-01-01T10:00:00Z"},
                {"reviewer": "Bad"},
                "junk"
            ]),
        )
        .unwrap();
        assert_eq!(load_reviews(&db).len(), 1);
    }

    #[test]
    fn load_skips_records_that_fail_validation() {
        let db = db::init_in_memory();
        write_local_json(
            &db,
            REVIEWS_KEY,
            &serde_json::json!([
                {"reviewer": "", "rating": 0, "message": "", "createdAt": "2026-01-01T10:00:00Z"},
                {"reviewer": "Ben", "rating": 9, "message": "too many stars", "createdAt": "2026-01-01T10:00:00Z"},
                {"reviewer": " Ana ", "rating": 5, "message": " ok ", "createdAt": "2026-01-01T11:00:00Z"}
            ]),
        )
        .unwrap();
        let store = load_reviews(&db);
        assert_eq!(names(&store), vec!["Ana"]);
        assert_eq!(store.most_recent_first()[0].message, "ok");
    }
}
