//! Account route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tracing::instrument;

use super::Page;
use super::checkout::OrderView;
use super::courses::CourseCard;
use crate::db::{CourseRepository, EnrollmentRepository, OrderRepository};
use crate::error::Result;
use crate::filters;
use crate::middleware::{CspNonce, RequireAuth};
use crate::state::AppState;

/// Orders shown on the account overview.
const RECENT_ORDERS: usize = 3;

/// Account overview template.
#[derive(Template, WebTemplate)]
#[template(path = "account/index.html")]
pub struct AccountTemplate {
    pub page: Page,
    pub email: String,
    pub display_name: String,
    pub orders: Vec<OrderView>,
    pub courses: Vec<CourseCard>,
}

/// Order history template.
#[derive(Template, WebTemplate)]
#[template(path = "account/orders.html")]
pub struct OrdersTemplate {
    pub page: Page,
    pub orders: Vec<OrderView>,
}

/// Account overview: recent orders and enrolled courses.
#[instrument(skip(state, user, nonce), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    nonce: CspNonce,
) -> Result<AccountTemplate> {
    let currency = state.config().payment.currency;
    let orders = OrderRepository::new(state.store())
        .list_for_user(&user.id)
        .await?;

    let enrollments = EnrollmentRepository::new(state.store())
        .list_for_user(&user.id)
        .await?;
    let courses_repo = CourseRepository::new(state.store());
    let mut courses = Vec::new();
    for enrollment in enrollments
        .iter()
        .filter(|e| knotwork_core::enrollment::grants_access(Some(&e.status)))
    {
        // A course deleted after purchase simply drops off the list.
        if let Some(course) = courses_repo.get(&enrollment.course_id).await? {
            courses.push(CourseCard::new(&course, currency));
        }
    }

    Ok(AccountTemplate {
        email: user.email.as_str().to_owned(),
        display_name: user.display_name.clone(),
        orders: orders
            .iter()
            .take(RECENT_ORDERS)
            .map(|o| OrderView::new(o, currency))
            .collect(),
        courses,
        page: Page::new(Some(user), &nonce),
    })
}

/// Full order history, newest first.
#[instrument(skip(state, user, nonce), fields(user_id = %user.id))]
pub async fn orders(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    nonce: CspNonce,
) -> Result<OrdersTemplate> {
    let currency = state.config().payment.currency;
    let orders = OrderRepository::new(state.store())
        .list_for_user(&user.id)
        .await?;
    Ok(OrdersTemplate {
        orders: orders.iter().map(|o| OrderView::new(o, currency)).collect(),
        page: Page::new(Some(user), &nonce),
    })
}
