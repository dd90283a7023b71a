//! Course management.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use knotwork_core::CourseId;
use knotwork_storefront::db::CourseRepository;
use knotwork_storefront::models::{Course, CourseVideo};

use super::{AdminPage, MessageQuery, money, parse_price};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireAdminAuth;
use crate::models::CurrentAdmin;
use crate::state::AppState;

/// A course row in the listing.
#[derive(Debug, Clone)]
pub struct CourseRow {
    pub id: String,
    pub title: String,
    pub price: String,
    pub lessons: usize,
    pub thumbnail: Option<String>,
}

/// Courses listing template.
#[derive(Template, WebTemplate)]
#[template(path = "courses/index.html")]
pub struct CoursesIndexTemplate {
    pub page: AdminPage,
    pub courses: Vec<CourseRow>,
}

/// Create/edit form template.
#[derive(Template, WebTemplate)]
#[template(path = "courses/form.html")]
pub struct CourseFormTemplate {
    pub page: AdminPage,
    pub heading: &'static str,
    pub action: String,
    pub form: CourseForm,
}

/// Course form fields. `videos` holds one URL per line.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CourseForm {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: String,
    #[serde(default)]
    pub videos: String,
}

/// Validated course fields.
#[derive(Debug)]
pub struct CourseInput {
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub videos: Vec<CourseVideo>,
}

impl CourseForm {
    fn from_course(course: &Course) -> Self {
        Self {
            title: course.title.clone(),
            description: course.description.clone(),
            price: course.price.to_string(),
            videos: course
                .videos
                .iter()
                .map(|v| v.youtube_url.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// Check every field. Any unrecognised video line rejects the whole form.
    fn validate(&self) -> std::result::Result<CourseInput, String> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err("Title is required.".to_owned());
        }

        let price = parse_price(&self.price).ok_or("Price must be a positive number.")?;

        let mut videos = Vec::new();
        for (index, line) in self.videos.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let video = CourseVideo::from_url(line).ok_or_else(|| {
                format!("Line {}: not a recognised video link.", index + 1)
            })?;
            videos.push(video);
        }
        if videos.is_empty() {
            return Err("Add at least one video link.".to_owned());
        }

        Ok(CourseInput {
            title: title.to_owned(),
            description: self.description.trim().to_owned(),
            price,
            videos,
        })
    }
}

fn form_page(
    admin: CurrentAdmin,
    heading: &'static str,
    action: String,
    form: CourseForm,
) -> CourseFormTemplate {
    CourseFormTemplate {
        page: AdminPage::new(admin, "/courses"),
        heading,
        action,
        form,
    }
}

/// List every course.
#[instrument(skip(admin, state))]
pub async fn index(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
) -> Result<CoursesIndexTemplate> {
    let currency = state.config().currency;
    let courses = CourseRepository::new(state.store()).list().await?;

    Ok(CoursesIndexTemplate {
        page: AdminPage::new(admin, "/courses").with_messages(&query),
        courses: courses
            .iter()
            .map(|c| CourseRow {
                id: c.id.to_string(),
                title: c.title.clone(),
                price: money(c.price, currency),
                lessons: c.videos.len(),
                thumbnail: c.cover_thumbnail(),
            })
            .collect(),
    })
}

/// Empty create form.
#[instrument(skip(admin))]
pub async fn new_form(RequireAdminAuth(admin): RequireAdminAuth) -> CourseFormTemplate {
    form_page(admin, "New course", "/courses".to_owned(), CourseForm::default())
}

/// Create a course.
#[instrument(skip(admin, state, form), fields(admin = %admin.email))]
pub async fn create(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Form(form): Form<CourseForm>,
) -> Result<Response> {
    let input = match form.validate() {
        Ok(input) => input,
        Err(message) => {
            let mut page = form_page(admin, "New course", "/courses".to_owned(), form);
            page.page = page.page.with_error(message);
            return Ok(page.into_response());
        }
    };

    let course = Course {
        id: CourseId::generate(),
        title: input.title,
        description: input.description,
        price: input.price,
        videos: input.videos,
        created_at: Utc::now(),
    };
    CourseRepository::new(state.store()).save(&course).await?;
    tracing::info!(course_id = %course.id, lessons = course.videos.len(), "Course created");

    Ok(Redirect::to("/courses?success=course_saved").into_response())
}

/// Edit form for an existing course.
#[instrument(skip(admin, state))]
pub async fn edit_form(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<CourseFormTemplate> {
    let id = CourseId::new(id);
    let course = CourseRepository::new(state.store())
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("course {id}")))?;

    Ok(form_page(
        admin,
        "Edit course",
        format!("/courses/{id}"),
        CourseForm::from_course(&course),
    ))
}

/// Update a course, replacing its lesson list.
#[instrument(skip(admin, state, form), fields(admin = %admin.email))]
pub async fn update(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<CourseForm>,
) -> Result<Response> {
    let id = CourseId::new(id);
    let repo = CourseRepository::new(state.store());
    let Some(existing) = repo.get(&id).await? else {
        return Ok(Redirect::to("/courses?error=not_found").into_response());
    };

    let input = match form.validate() {
        Ok(input) => input,
        Err(message) => {
            let mut page = form_page(admin, "Edit course", format!("/courses/{id}"), form);
            page.page = page.page.with_error(message);
            return Ok(page.into_response());
        }
    };

    let course = Course {
        title: input.title,
        description: input.description,
        price: input.price,
        videos: input.videos,
        ..existing
    };
    repo.save(&course).await?;
    tracing::info!(course_id = %course.id, "Course updated");

    Ok(Redirect::to("/courses?success=course_saved").into_response())
}

/// Delete a course. Existing enrollments are left in place.
#[instrument(skip(admin, state), fields(admin = %admin.email))]
pub async fn delete(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Redirect> {
    let id = CourseId::new(id);
    if CourseRepository::new(state.store()).delete(&id).await? {
        tracing::info!(course_id = %id, "Course deleted");
        Ok(Redirect::to("/courses?success=course_deleted"))
    } else {
        Ok(Redirect::to("/courses?error=not_found"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn form(videos: &str) -> CourseForm {
        CourseForm {
            title: "Beginner macrame".to_owned(),
            description: String::new(),
            price: "999".to_owned(),
            videos: videos.to_owned(),
        }
    }

    #[test]
    fn test_blank_lines_are_ignored() {
        let input = form("https://youtu.be/dQw4w9WgXcQ\n\n  https://www.youtube.com/watch?v=9bZkp7q19f0  \n")
            .validate()
            .unwrap();
        assert_eq!(input.videos.len(), 2);
        assert_eq!(input.videos[1].youtube_url, "https://www.youtube.com/watch?v=9bZkp7q19f0");
    }

    #[test]
    fn test_invalid_line_reports_its_number() {
        let err = form("https://youtu.be/dQw4w9WgXcQ\nhttps://example.com/video")
            .validate()
            .unwrap_err();
        assert!(err.starts_with("Line 2"));
    }

    #[test]
    fn test_requires_a_video() {
        assert!(form("  \n").validate().is_err());
    }

    #[test]
    fn test_rejects_zero_price() {
        let mut f = form("https://youtu.be/dQw4w9WgXcQ");
        f.price = "0".to_owned();
        assert!(f.validate().is_err());
    }
}
