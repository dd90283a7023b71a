//! Enrollment repository.

use knotwork_core::{CourseId, EnrollmentId, UserId};

use super::{RepositoryError, collections};
use crate::models::Enrollment;
use crate::store::{Direction, DocumentStore, Query};

/// Repository for course enrollments.
pub struct EnrollmentRepository<'a> {
    store: &'a DocumentStore,
}

impl<'a> EnrollmentRepository<'a> {
    /// Create a new enrollment repository.
    #[must_use]
    pub const fn new(store: &'a DocumentStore) -> Self {
        Self { store }
    }

    /// The enrollment for a (user, course) pair, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store fails or the document is malformed.
    pub async fn get(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
    ) -> Result<Option<Enrollment>, RepositoryError> {
        let id = EnrollmentId::for_pair(user_id, course_id);
        Ok(self.store.get_as(collections::ENROLLMENTS, id.as_str()).await?)
    }

    /// Write an enrollment, replacing any earlier record for the pair.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store fails.
    pub async fn save(&self, enrollment: &Enrollment) -> Result<(), RepositoryError> {
        Ok(self
            .store
            .set_as(collections::ENROLLMENTS, enrollment.id.as_str(), enrollment)
            .await?)
    }

    /// A user's enrollments, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store fails or a document is malformed.
    pub async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Enrollment>, RepositoryError> {
        let query = Query::collection(collections::ENROLLMENTS)
            .where_eq("userId", user_id.as_str())
            .order_by("createdAt", Direction::Descending);
        Ok(self.store.query_as(&query).await?)
    }

    /// Every enrollment, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store fails or a document is malformed.
    pub async fn list_all(&self) -> Result<Vec<Enrollment>, RepositoryError> {
        let query =
            Query::collection(collections::ENROLLMENTS).order_by("createdAt", Direction::Descending);
        Ok(self.store.query_as(&query).await?)
    }

    /// Remove an enrollment. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store fails.
    pub async fn delete(&self, id: &EnrollmentId) -> Result<bool, RepositoryError> {
        Ok(self.store.delete(collections::ENROLLMENTS, id.as_str()).await?)
    }
}
