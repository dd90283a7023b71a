//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Query, State};
use tracing::instrument;

use super::courses::CourseCard;
use super::products::ProductCard;
use super::{MessageQuery, Page};
use crate::db::{CourseRepository, ProductRepository};
use crate::error::Result;
use crate::filters;
use crate::middleware::{CspNonce, OptionalAuth};
use crate::state::AppState;

/// Products shown on the home page.
const FEATURED_PRODUCTS: usize = 8;

/// Courses shown on the home page.
const FEATURED_COURSES: usize = 3;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
pub struct HomeTemplate {
    pub page: Page,
    pub products: Vec<ProductCard>,
    pub courses: Vec<CourseCard>,
}

/// Display the home page: newest products and a few courses.
#[instrument(skip(state, nonce, user))]
pub async fn home(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    nonce: CspNonce,
    Query(query): Query<MessageQuery>,
) -> Result<HomeTemplate> {
    let currency = state.config().payment.currency;
    let products = ProductRepository::new(state.store())
        .latest(FEATURED_PRODUCTS)
        .await?;
    let courses = CourseRepository::new(state.store()).list().await?;

    Ok(HomeTemplate {
        page: Page::new(user, &nonce).with_messages(&query),
        products: products
            .iter()
            .map(|p| ProductCard::new(p, currency))
            .collect(),
        courses: courses
            .iter()
            .take(FEATURED_COURSES)
            .map(|c| CourseCard::new(c, currency))
            .collect(),
    })
}
