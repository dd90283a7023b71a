//! Course enrollments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use knotwork_core::{CourseId, EnrollmentId, EnrollmentStatus, UserId};

/// A user's enrollment in a course, keyed `{userId}_{courseId}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub user_id: UserId,
    pub course_id: CourseId,
    pub status: EnrollmentStatus,
    #[serde(default)]
    pub payment_id: Option<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Enrollment {
    /// A paid enrollment for `user_id` in `course_id`.
    #[must_use]
    pub fn paid(user_id: UserId, course_id: CourseId, payment_id: String) -> Self {
        Self {
            id: EnrollmentId::for_pair(&user_id, &course_id),
            user_id,
            course_id,
            status: EnrollmentStatus::Paid,
            payment_id: Some(payment_id),
            created_at: Utc::now(),
        }
    }
}
