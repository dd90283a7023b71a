//! Product ratings and written reviews.

use chrono::Utc;
use thiserror::Error;
use tracing::instrument;

use knotwork_core::rating::{RatingAggregate, Score};
use knotwork_core::{ProductId, RatingId, ReviewId, UserId};

use crate::db::{ProductRepository, RatingRepository, RepositoryError, ReviewRepository};
use crate::models::{RatingRecord, Review};
use crate::store::DocumentStore;

/// Longest review body accepted.
pub const MAX_REVIEW_LEN: usize = 2000;

/// Errors from rating and reviewing.
#[derive(Debug, Error)]
pub enum RatingError {
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    #[error("review cannot be empty")]
    EmptyReview,

    #[error("review is longer than {MAX_REVIEW_LEN} characters")]
    ReviewTooLong,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Result of a rating attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RatingOutcome {
    /// The rating was stored; the product now shows this aggregate.
    Recorded(RatingAggregate),
    /// The user had already rated this product; nothing changed.
    AlreadyRated(Score),
}

/// Rating service.
pub struct RatingService<'a> {
    products: ProductRepository<'a>,
    ratings: RatingRepository<'a>,
    reviews: ReviewRepository<'a>,
}

impl<'a> RatingService<'a> {
    #[must_use]
    pub const fn new(store: &'a DocumentStore) -> Self {
        Self {
            products: ProductRepository::new(store),
            ratings: RatingRepository::new(store),
            reviews: ReviewRepository::new(store),
        }
    }

    /// The score this user gave the product, if any.
    ///
    /// # Errors
    ///
    /// Returns `RatingError::Repository` if the store fails.
    pub async fn user_rating(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
    ) -> Result<Option<Score>, RatingError> {
        Ok(self
            .ratings
            .get(user_id, product_id)
            .await?
            .map(|record| record.rating))
    }

    /// Rate a product once.
    ///
    /// The per-user record is written first and only if absent. The product
    /// aggregate is then updated read-modify-write, so two raters finishing
    /// together can lose one update to the average.
    ///
    /// # Errors
    ///
    /// Returns `RatingError::ProductNotFound` if the product does not exist.
    #[instrument(skip(self), fields(score = score.get()))]
    pub async fn rate(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
        score: Score,
    ) -> Result<RatingOutcome, RatingError> {
        let product = self
            .products
            .get(product_id)
            .await?
            .ok_or_else(|| RatingError::ProductNotFound(product_id.clone()))?;

        let record = RatingRecord {
            id: RatingId::for_pair(user_id, product_id),
            user_id: user_id.clone(),
            product_id: product_id.clone(),
            rating: score,
            created_at: Utc::now(),
        };
        match self.ratings.create(&record).await {
            Ok(()) => {}
            Err(RepositoryError::Conflict(_)) => {
                let existing = self.user_rating(user_id, product_id).await?.unwrap_or(score);
                return Ok(RatingOutcome::AlreadyRated(existing));
            }
            Err(e) => return Err(e.into()),
        }

        let aggregate = product.rating.with_rating(score);
        self.products.set_rating(product_id, aggregate).await?;
        tracing::info!(ratings_count = aggregate.ratings_count, "Rating recorded");
        Ok(RatingOutcome::Recorded(aggregate))
    }

    /// Store a written review.
    ///
    /// # Errors
    ///
    /// Returns `RatingError::EmptyReview` for a blank body and
    /// `RatingError::ProductNotFound` if the product does not exist.
    #[instrument(skip(self, author_name, body))]
    pub async fn add_review(
        &self,
        user_id: &UserId,
        author_name: &str,
        product_id: &ProductId,
        body: &str,
    ) -> Result<Review, RatingError> {
        let body = body.trim();
        if body.is_empty() {
            return Err(RatingError::EmptyReview);
        }
        if body.chars().count() > MAX_REVIEW_LEN {
            return Err(RatingError::ReviewTooLong);
        }
        if self.products.get(product_id).await?.is_none() {
            return Err(RatingError::ProductNotFound(product_id.clone()));
        }

        let review = Review {
            id: ReviewId::generate(),
            product_id: product_id.clone(),
            user_id: user_id.clone(),
            author_name: author_name.trim().to_owned(),
            body: body.to_owned(),
            created_at: Utc::now(),
        };
        self.reviews.create(&review).await?;
        Ok(review)
    }

    /// A product's reviews, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RatingError::Repository` if the store fails.
    pub async fn reviews(&self, product_id: &ProductId) -> Result<Vec<Review>, RatingError> {
        Ok(self.reviews.list_for_product(product_id).await?)
    }
}
