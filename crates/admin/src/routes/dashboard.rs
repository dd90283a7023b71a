//! Dashboard route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Query, State};
use tracing::instrument;

use knotwork_core::OrderStatus;
use knotwork_storefront::db::{
    CourseRepository, EnrollmentRepository, OrderRepository, ProductRepository,
};

use super::orders::OrderRow;
use super::{AdminPage, MessageQuery, money};
use crate::error::Result;
use crate::filters;
use crate::middleware::RequireAdminAuth;
use crate::state::AppState;

/// Orders shown on the dashboard.
const RECENT_ORDERS: usize = 5;

/// Dashboard counts.
#[derive(Debug, Clone, Default)]
pub struct DashboardMetrics {
    pub products: usize,
    pub out_of_stock: usize,
    pub courses: usize,
    pub orders: usize,
    pub pending_orders: usize,
    pub enrollments: usize,
    pub revenue: String,
}

/// Dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub page: AdminPage,
    pub metrics: DashboardMetrics,
    pub recent_orders: Vec<OrderRow>,
}

/// Dashboard page handler.
#[instrument(skip(admin, state))]
pub async fn index(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
) -> Result<DashboardTemplate> {
    let store = state.store();
    let currency = state.config().currency;

    let products = ProductRepository::new(store).list().await?;
    let courses = CourseRepository::new(store).list().await?;
    let orders = OrderRepository::new(store).list_all().await?;
    let enrollments = EnrollmentRepository::new(store).list_all().await?;

    let revenue = orders
        .iter()
        .filter(|o| o.status != OrderStatus::Cancelled)
        .map(|o| o.total)
        .sum();

    let metrics = DashboardMetrics {
        products: products.len(),
        out_of_stock: products.iter().filter(|p| !p.in_stock).count(),
        courses: courses.len(),
        orders: orders.len(),
        pending_orders: orders
            .iter()
            .filter(|o| o.status == OrderStatus::Pending)
            .count(),
        enrollments: enrollments.len(),
        revenue: money(revenue, currency),
    };

    Ok(DashboardTemplate {
        page: AdminPage::new(admin, "/").with_messages(&query),
        metrics,
        recent_orders: orders
            .iter()
            .take(RECENT_ORDERS)
            .map(|o| OrderRow::new(o, currency))
            .collect(),
    })
}
