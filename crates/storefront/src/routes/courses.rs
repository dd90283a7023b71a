//! Course route handlers.
//!
//! Anyone may browse courses. Watching requires a `paid` enrollment for the
//! (user, course) pair; the player page then runs the single-active-session
//! check from `static/js/player.js`.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use knotwork_core::enrollment::grants_access;
use knotwork_core::{CourseId, CurrencyCode};

use super::checkout::ConfirmForm;
use super::{MessageQuery, Page, money};
use crate::config::ContentProtectionConfig;
use crate::db::{CourseRepository, EnrollmentRepository};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{CspNonce, OptionalAuth, RequireAuth};
use crate::models::{Course, CurrentUser};
use crate::services::checkout::CheckoutService;
use crate::services::messaging::{enrollment_message, whatsapp_link};
use crate::services::payment::{PaymentConfirmation, Prefill, WidgetOptions};
use crate::state::AppState;

/// Course tile for listings.
#[derive(Debug, Clone)]
pub struct CourseCard {
    pub id: String,
    pub title: String,
    pub price: String,
    pub thumbnail: Option<String>,
    pub lesson_count: usize,
}

impl CourseCard {
    #[must_use]
    pub fn new(course: &Course, currency: CurrencyCode) -> Self {
        Self {
            id: course.id.to_string(),
            title: course.title.clone(),
            price: money(course.price, currency),
            thumbnail: course.cover_thumbnail(),
            lesson_count: course.videos.len(),
        }
    }
}

/// A lesson in the player.
#[derive(Debug, Clone)]
pub struct LessonView {
    pub number: usize,
    pub embed_url: String,
    pub thumbnail: String,
}

/// Purchase widget data for the course page.
#[derive(Debug, Clone)]
pub struct PurchaseView {
    pub options_json: String,
    pub script_url: String,
    pub confirm_url: String,
}

/// Course listing page.
#[derive(Template, WebTemplate)]
#[template(path = "courses/index.html")]
pub struct CoursesIndexTemplate {
    pub page: Page,
    pub courses: Vec<CourseCard>,
}

/// Course detail page.
#[derive(Template, WebTemplate)]
#[template(path = "courses/show.html")]
pub struct CourseShowTemplate {
    pub page: Page,
    pub course: CourseCard,
    pub description: String,
    pub thumbnails: Vec<String>,
    pub enrolled: bool,
    /// Present when a signed-in user can buy.
    pub purchase: Option<PurchaseView>,
    /// Chat hand-off for enrolled users.
    pub chat_link: Option<String>,
}

/// Player page.
#[derive(Template, WebTemplate)]
#[template(path = "courses/watch.html")]
pub struct WatchTemplate {
    pub page: Page,
    pub course_id: String,
    pub title: String,
    pub lessons: Vec<LessonView>,
    pub current: Option<LessonView>,
    pub protection: ContentProtectionConfig,
    /// Text floated over the video.
    pub watermark_text: String,
}

/// Lesson selection.
#[derive(Debug, Deserialize)]
pub struct WatchQuery {
    pub lesson: Option<usize>,
}

async fn load_course(state: &AppState, id: &CourseId) -> Result<Course> {
    CourseRepository::new(state.store())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("course {id}")))
}

/// Display the course catalog.
#[instrument(skip(state, nonce, user))]
pub async fn index(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    nonce: CspNonce,
) -> Result<CoursesIndexTemplate> {
    let currency = state.config().payment.currency;
    let courses = CourseRepository::new(state.store()).list().await?;
    Ok(CoursesIndexTemplate {
        page: Page::new(user, &nonce),
        courses: courses.iter().map(|c| CourseCard::new(c, currency)).collect(),
    })
}

fn purchase_view(state: &AppState, course: &Course, user: &CurrentUser) -> Result<PurchaseView> {
    let payment = &state.config().payment;
    let options = WidgetOptions::new(
        payment,
        course.price,
        course.title.clone(),
        Prefill {
            name: user.display_name.clone(),
            email: user.email.as_str().to_owned(),
            contact: String::new(),
        },
    )?
    .with_note("userId", user.id.as_str())
    .with_note("courseId", course.id.as_str());

    Ok(PurchaseView {
        options_json: options
            .to_json()
            .map_err(|e| AppError::Internal(format!("widget options: {e}")))?,
        script_url: payment.script_url.clone(),
        confirm_url: format!("/courses/{}/enroll", course.id),
    })
}

/// Display a course: lessons preview, then either a buy button or a link
/// to the player.
#[instrument(skip(state, nonce, user, query))]
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    nonce: CspNonce,
    Path(id): Path<String>,
    Query(query): Query<MessageQuery>,
) -> Result<CourseShowTemplate> {
    let id = CourseId::new(id);
    let course = load_course(&state, &id).await?;
    let currency = state.config().payment.currency;

    let enrollment = match &user {
        Some(u) => EnrollmentRepository::new(state.store()).get(&u.id, &id).await?,
        None => None,
    };
    let enrolled = grants_access(enrollment.as_ref().map(|e| &e.status));

    let purchase = match &user {
        Some(u) if !enrolled => Some(purchase_view(&state, &course, u)?),
        _ => None,
    };
    let chat_link = enrollment.filter(|_| enrolled).map(|e| {
        whatsapp_link(
            &state.config().messaging.operator_number,
            &enrollment_message(&course, &e),
        )
    });

    Ok(CourseShowTemplate {
        page: Page::new(user, &nonce).with_messages(&query),
        course: CourseCard::new(&course, currency),
        description: course.description.clone(),
        thumbnails: course.videos.iter().filter_map(|v| v.thumbnail()).collect(),
        enrolled,
        purchase,
        chat_link,
    })
}

/// Record a paid enrollment after the widget reports success.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn enroll(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
    Form(form): Form<ConfirmForm>,
) -> Result<Response> {
    let id = CourseId::new(id);
    let confirmation = match PaymentConfirmation::parse(&form.payment_id) {
        Ok(confirmation) => confirmation,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected payment confirmation");
            return Ok(Redirect::to(&format!("/courses/{id}?error=payment")).into_response());
        }
    };

    CheckoutService::new(state.store())
        .enroll(&user.id, &id, &confirmation)
        .await?;
    Ok(Redirect::to(&format!("/courses/{id}/watch?success=enrolled")).into_response())
}

/// The player. Only enrolled users get past the gate.
#[instrument(skip(state, nonce, user), fields(user_id = %user.id))]
pub async fn watch(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    nonce: CspNonce,
    Path(id): Path<String>,
    Query(query): Query<WatchQuery>,
    Query(messages): Query<MessageQuery>,
) -> Result<Response> {
    let id = CourseId::new(id);
    let checkout = CheckoutService::new(state.store());
    let course = checkout.course(&id).await?;
    if !checkout.has_access(&user.id, &id).await? {
        return Ok(Redirect::to(&format!("/courses/{id}?error=not_enrolled")).into_response());
    }

    let lessons: Vec<LessonView> = course
        .videos
        .iter()
        .filter_map(|video| video.video_id())
        .enumerate()
        .map(|(i, video)| LessonView {
            number: i + 1,
            embed_url: video.embed_url(),
            thumbnail: video.thumbnail_url(),
        })
        .collect();
    let current = query
        .lesson
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| lessons.get(i))
        .or_else(|| lessons.first())
        .cloned();

    Ok(WatchTemplate {
        course_id: course.id.to_string(),
        title: course.title,
        lessons,
        current,
        protection: state.config().protection,
        watermark_text: user.email.as_str().to_owned(),
        page: Page::new(Some(user), &nonce).with_messages(&messages),
    }
    .into_response())
}
