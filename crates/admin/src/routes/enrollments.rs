//! Enrollment overview.

use std::collections::HashMap;

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Query, State};
use tracing::instrument;

use knotwork_storefront::db::{CourseRepository, EnrollmentRepository, UserRepository};
use knotwork_storefront::models::{Course, Enrollment, UserProfile};

use super::{AdminPage, MessageQuery};
use crate::error::Result;
use crate::filters;
use crate::middleware::RequireAdminAuth;
use crate::state::AppState;

/// An enrollment joined with its user and course.
#[derive(Debug, Clone)]
pub struct EnrollmentRow {
    pub id: String,
    pub user: String,
    pub email: String,
    pub course: String,
    pub status: String,
    pub payment_id: String,
    pub date: String,
}

impl EnrollmentRow {
    /// Missing users or courses show their raw id.
    fn new(
        enrollment: &Enrollment,
        users: &HashMap<&str, &UserProfile>,
        courses: &HashMap<&str, &Course>,
    ) -> Self {
        let user = users.get(enrollment.user_id.as_str());
        Self {
            id: enrollment.id.to_string(),
            user: user.map_or_else(
                || enrollment.user_id.to_string(),
                |u| u.greeting_name().to_owned(),
            ),
            email: user.map(|u| u.email.to_string()).unwrap_or_default(),
            course: courses.get(enrollment.course_id.as_str()).map_or_else(
                || format!("{} (deleted)", enrollment.course_id),
                |c| c.title.clone(),
            ),
            status: enrollment.status.as_str().to_owned(),
            payment_id: enrollment.payment_id.clone().unwrap_or_default(),
            date: enrollment.created_at.format("%Y-%m-%d").to_string(),
        }
    }
}

/// Enrollments page template.
#[derive(Template, WebTemplate)]
#[template(path = "enrollments/index.html")]
pub struct EnrollmentsTemplate {
    pub page: AdminPage,
    pub enrollments: Vec<EnrollmentRow>,
}

/// List every enrollment, newest first.
#[instrument(skip(admin, state))]
pub async fn index(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
) -> Result<EnrollmentsTemplate> {
    let store = state.store();
    let enrollments = EnrollmentRepository::new(store).list_all().await?;
    let profiles = UserRepository::new(store).list_profiles().await?;
    let courses = CourseRepository::new(store).list().await?;

    let users: HashMap<&str, &UserProfile> =
        profiles.iter().map(|p| (p.id.as_str(), p)).collect();
    let courses: HashMap<&str, &Course> = courses.iter().map(|c| (c.id.as_str(), c)).collect();

    Ok(EnrollmentsTemplate {
        page: AdminPage::new(admin, "/enrollments").with_messages(&query),
        enrollments: enrollments
            .iter()
            .map(|e| EnrollmentRow::new(e, &users, &courses))
            .collect(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use knotwork_core::{CourseId, Email, UserId, UserRole};

    use super::*;

    #[test]
    fn test_row_joins_user_and_course() {
        let profile = UserProfile {
            id: UserId::new("u1"),
            email: Email::parse("asha@example.com").unwrap(),
            display_name: "Asha".to_owned(),
            role: UserRole::Customer,
            active_session_token: None,
            created_at: Utc::now(),
        };
        let course = Course {
            id: CourseId::new("c1"),
            title: "Plant hangers".to_owned(),
            description: String::new(),
            price: Decimal::new(499, 0),
            videos: Vec::new(),
            created_at: Utc::now(),
        };
        let enrollment = Enrollment::paid(profile.id.clone(), course.id.clone(), "pay_1".to_owned());

        let users = HashMap::from([(profile.id.as_str(), &profile)]);
        let courses = HashMap::from([(course.id.as_str(), &course)]);
        let row = EnrollmentRow::new(&enrollment, &users, &courses);

        assert_eq!(row.id, "u1_c1");
        assert_eq!(row.user, "Asha");
        assert_eq!(row.course, "Plant hangers");
        assert_eq!(row.status, "paid");
    }

    #[test]
    fn test_row_survives_deleted_course() {
        let enrollment = Enrollment::paid(UserId::new("u9"), CourseId::new("gone"), "pay_2".to_owned());
        let row = EnrollmentRow::new(&enrollment, &HashMap::new(), &HashMap::new());
        assert_eq!(row.user, "u9");
        assert_eq!(row.course, "gone (deleted)");
        assert!(row.email.is_empty());
    }
}
