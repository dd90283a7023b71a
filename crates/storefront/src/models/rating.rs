//! Ratings and reviews.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use knotwork_core::rating::Score;
use knotwork_core::{ProductId, RatingId, ReviewId, UserId};

/// One user's rating of one product, keyed `{userId}_{productId}`.
///
/// Written once; a second rating by the same user is refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingRecord {
    pub id: RatingId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub rating: Score,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

/// A written product review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub user_id: UserId,
    pub author_name: String,
    pub body: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}
