//! Product route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use knotwork_core::rating::Score;
use knotwork_core::{CurrencyCode, ProductId};

use super::{MessageQuery, Page, money};
use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{CspNonce, OptionalAuth, RequireAuth};
use crate::models::{Product, Review};
use crate::services::ratings::{RatingError, RatingOutcome, RatingService};
use crate::state::AppState;

/// Product tile for listings.
#[derive(Debug, Clone)]
pub struct ProductCard {
    pub id: String,
    pub name: String,
    pub price: String,
    pub original_price: Option<String>,
    pub image: Option<String>,
    pub in_stock: bool,
    pub average: String,
    pub ratings_count: u32,
}

impl ProductCard {
    #[must_use]
    pub fn new(product: &Product, currency: CurrencyCode) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            price: money(product.price, currency),
            original_price: product
                .on_sale()
                .then(|| product.original_price.map(|p| money(p, currency)))
                .flatten(),
            image: product.cover_image().map(str::to_owned),
            in_stock: product.in_stock,
            average: product.rating.display_average(),
            ratings_count: product.rating.ratings_count,
        }
    }
}

/// A review as displayed.
#[derive(Debug, Clone)]
pub struct ReviewView {
    pub author_name: String,
    pub body: String,
    pub date: String,
}

impl From<&Review> for ReviewView {
    fn from(review: &Review) -> Self {
        Self {
            author_name: review.author_name.clone(),
            body: review.body.clone(),
            date: review.created_at.format("%-d %b %Y").to_string(),
        }
    }
}

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub page: Page,
    pub products: Vec<ProductCard>,
    pub category: Option<String>,
    pub categories: Vec<String>,
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub page: Page,
    pub product: ProductCard,
    pub description: String,
    pub images: Vec<String>,
    pub reviews: Vec<ReviewView>,
    /// The signed-in user's score, if they rated.
    pub user_rating: Option<u8>,
}

/// Listing filter.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub category: Option<String>,
}

/// Rating form.
#[derive(Debug, Deserialize)]
pub struct RateForm {
    pub score: i64,
}

/// Review form.
#[derive(Debug, Deserialize)]
pub struct ReviewForm {
    pub body: String,
}

/// Display the product listing, optionally filtered by category.
#[instrument(skip(state, nonce, user))]
pub async fn index(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    nonce: CspNonce,
    Query(query): Query<ListQuery>,
) -> Result<ProductsIndexTemplate> {
    let currency = state.config().payment.currency;
    let products = ProductRepository::new(state.store()).list().await?;

    let mut categories: Vec<String> = products
        .iter()
        .filter_map(|p| p.category.clone())
        .collect();
    categories.sort();
    categories.dedup();

    let category = query.category.filter(|c| !c.is_empty());
    let cards = products
        .iter()
        .filter(|p| category.is_none() || p.category == category)
        .map(|p| ProductCard::new(p, currency))
        .collect();

    Ok(ProductsIndexTemplate {
        page: Page::new(user, &nonce),
        products: cards,
        category,
        categories,
    })
}

/// Display a product with its reviews.
#[instrument(skip(state, nonce, user, query))]
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    nonce: CspNonce,
    Path(id): Path<String>,
    Query(query): Query<MessageQuery>,
) -> Result<ProductShowTemplate> {
    let id = ProductId::new(id);
    let product = ProductRepository::new(state.store())
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    let ratings = RatingService::new(state.store());
    let reviews = ratings.reviews(&id).await?;
    let user_rating = match &user {
        Some(u) => ratings.user_rating(&u.id, &id).await?.map(Score::get),
        None => None,
    };

    Ok(ProductShowTemplate {
        page: Page::new(user, &nonce).with_messages(&query),
        product: ProductCard::new(&product, state.config().payment.currency),
        description: product.description.clone(),
        images: product.images.clone(),
        reviews: reviews.iter().map(ReviewView::from).collect(),
        user_rating,
    })
}

fn back_to(id: &ProductId, flash: &str) -> Response {
    Redirect::to(&format!("/products/{id}?{flash}")).into_response()
}

/// Rate a product once.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn rate(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
    Form(form): Form<RateForm>,
) -> Result<Response> {
    let id = ProductId::new(id);
    let Ok(score) = Score::try_from(form.score) else {
        return Ok(back_to(&id, "error=invalid_rating"));
    };

    match RatingService::new(state.store())
        .rate(&user.id, &id, score)
        .await?
    {
        RatingOutcome::Recorded(_) => Ok(back_to(&id, "success=rated")),
        RatingOutcome::AlreadyRated(_) => Ok(back_to(&id, "error=already_rated")),
    }
}

/// Add a written review.
#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn review(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
    Form(form): Form<ReviewForm>,
) -> Result<Response> {
    let id = ProductId::new(id);
    match RatingService::new(state.store())
        .add_review(&user.id, &user.display_name, &id, &form.body)
        .await
    {
        Ok(_) => Ok(back_to(&id, "success=reviewed")),
        Err(RatingError::EmptyReview | RatingError::ReviewTooLong) => {
            Ok(back_to(&id, "error=empty_review"))
        }
        Err(e) => Err(e.into()),
    }
}
