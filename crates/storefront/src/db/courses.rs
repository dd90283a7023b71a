//! Course repository.

use knotwork_core::CourseId;

use super::{RepositoryError, collections};
use crate::models::Course;
use crate::store::{Direction, DocumentStore, Query};

/// Repository for video courses.
pub struct CourseRepository<'a> {
    store: &'a DocumentStore,
}

impl<'a> CourseRepository<'a> {
    /// Create a new course repository.
    #[must_use]
    pub const fn new(store: &'a DocumentStore) -> Self {
        Self { store }
    }

    /// All courses, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store fails or a document is malformed.
    pub async fn list(&self) -> Result<Vec<Course>, RepositoryError> {
        let query = Query::collection(collections::COURSES).order_by("createdAt", Direction::Descending);
        Ok(self.store.query_as(&query).await?)
    }

    /// Get a course by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store fails or the document is malformed.
    pub async fn get(&self, id: &CourseId) -> Result<Option<Course>, RepositoryError> {
        Ok(self.store.get_as(collections::COURSES, id.as_str()).await?)
    }

    /// Insert or replace a course.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store fails.
    pub async fn save(&self, course: &Course) -> Result<(), RepositoryError> {
        Ok(self
            .store
            .set_as(collections::COURSES, course.id.as_str(), course)
            .await?)
    }

    /// Delete a course. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store fails.
    pub async fn delete(&self, id: &CourseId) -> Result<bool, RepositoryError> {
        Ok(self.store.delete(collections::COURSES, id.as_str()).await?)
    }
}
