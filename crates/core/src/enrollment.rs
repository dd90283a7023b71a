//! Course access gating.
//!
//! Access to a course's lessons is decided by a single rule: an enrollment
//! record exists for the (user, course) pair and its status is exactly
//! `paid`. Nothing else (role, order history, a payment id on the record)
//! can open a course.

use crate::EnrollmentStatus;

/// Whether an enrollment status (if a record exists) grants access.
#[must_use]
pub fn grants_access(status: Option<&EnrollmentStatus>) -> bool {
    matches!(status, Some(EnrollmentStatus::Paid))
}
