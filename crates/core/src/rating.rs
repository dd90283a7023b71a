//! Product ratings.
//!
//! A product carries a running `averageRating` and `ratingsCount`. Adding a
//! rating is a read-modify-write of those two fields; two raters finishing at
//! the same moment can overwrite each other's update. That lost update is a
//! known property of the stored aggregate, not something this module hides.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lowest accepted score.
pub const MIN_SCORE: u8 = 1;
/// Highest accepted score.
pub const MAX_SCORE: u8 = 5;

/// Rejected score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("rating must be between {MIN_SCORE} and {MAX_SCORE}, got {0}")]
pub struct ScoreOutOfRange(pub i64);

/// A 1–5 star score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Score(u8);

impl Score {
    /// The score as a number.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Score {
    type Error = ScoreOutOfRange;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .ok()
            .filter(|v| (MIN_SCORE..=MAX_SCORE).contains(v))
            .map(Self)
            .ok_or(ScoreOutOfRange(value))
    }
}

impl From<Score> for u8 {
    fn from(score: Score) -> Self {
        score.0
    }
}

/// Average rating and number of ratings, as stored on the product.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RatingAggregate {
    pub average_rating: f64,
    pub ratings_count: u32,
}

impl RatingAggregate {
    /// The aggregate after one more rating.
    #[must_use]
    pub fn with_rating(self, score: Score) -> Self {
        let count = self.ratings_count.saturating_add(1);
        let total = self
            .average_rating
            .mul_add(f64::from(self.ratings_count), f64::from(score.get()));
        Self {
            average_rating: total / f64::from(count),
            ratings_count: count,
        }
    }

    /// Average rounded to one decimal for display.
    #[must_use]
    pub fn display_average(&self) -> String {
        format!("{:.1}", self.average_rating)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(v: i64) -> Score {
        Score::try_from(v).unwrap_or_else(|e| panic!("{e}"))
    }

    #[test]
    fn test_score_bounds() {
        assert!(Score::try_from(0).is_err());
        assert!(Score::try_from(6).is_err());
        assert!(Score::try_from(-3).is_err());
        assert_eq!(score(1).get(), 1);
        assert_eq!(score(5).get(), 5);
    }

    #[test]
    fn test_first_rating_sets_average() {
        let aggregate = RatingAggregate::default().with_rating(score(4));
        assert_eq!(aggregate.ratings_count, 1);
        assert!((aggregate.average_rating - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_running_average() {
        let aggregate = RatingAggregate {
            average_rating: 4.0,
            ratings_count: 3,
        }
        .with_rating(score(2));
        assert_eq!(aggregate.ratings_count, 4);
        assert!((aggregate.average_rating - 3.5).abs() < f64::EPSILON);
        assert_eq!(aggregate.display_average(), "3.5");
    }

    #[test]
    fn test_score_deserialize_rejects_out_of_range() {
        assert!(serde_json::from_str::<Score>("3").is_ok());
        assert!(serde_json::from_str::<Score>("9").is_err());
    }
}
