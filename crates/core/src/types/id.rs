//! Newtype IDs for type-safe document references.
//!
//! Every record in the document store is addressed by a string key. Use the
//! `define_id!` macro to create wrappers that prevent accidentally mixing keys
//! from different collections.

use serde::{Deserialize, Serialize};

/// Macro to define a type-safe document ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `generate()`, `as_str()`
/// - `From<String>`, `From<&str>` and `Display` implementations
///
/// # Example
///
/// ```rust
/// # use knotwork_core::define_id;
/// define_id!(UserId);
/// define_id!(OrderId);
///
/// let user_id = UserId::new("u1");
/// let order_id = OrderId::new("u1");
///
/// // These are different types, so this won't compile:
/// // let _: UserId = order_id;
/// # assert_eq!(user_id.as_str(), order_id.as_str());
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create an ID from an existing document key.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Generate a fresh random document key.
            #[must_use]
            pub fn generate() -> Self {
                Self(::uuid::Uuid::new_v4().simple().to_string())
            }

            /// Get the underlying key.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the ID and return the underlying key.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(UserId);
define_id!(ProductId);
define_id!(CourseId);
define_id!(OrderId);
define_id!(ReviewId);

/// Key of an enrollment record: `{user_id}_{course_id}`.
///
/// The composite key makes "is this user enrolled in this course" a single
/// point read instead of a query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnrollmentId(String);

impl EnrollmentId {
    /// Build the key for a (user, course) pair.
    #[must_use]
    pub fn for_pair(user_id: &UserId, course_id: &CourseId) -> Self {
        Self(format!("{user_id}_{course_id}"))
    }

    /// Get the underlying key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EnrollmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key of a rating record: `{user_id}_{product_id}`.
///
/// One key per (user, product) is what makes ratings write-once.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RatingId(String);

impl RatingId {
    /// Build the key for a (user, product) pair.
    #[must_use]
    pub fn for_pair(user_id: &UserId, product_id: &ProductId) -> Self {
        Self(format!("{user_id}_{product_id}"))
    }

    /// Get the underlying key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RatingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enrollment_id_is_user_then_course() {
        let id = EnrollmentId::for_pair(&UserId::new("alice"), &CourseId::new("knit-101"));
        assert_eq!(id.as_str(), "alice_knit-101");
    }

    #[test]
    fn test_rating_id_is_user_then_product() {
        let id = RatingId::for_pair(&UserId::new("bob"), &ProductId::new("yarn"));
        assert_eq!(id.to_string(), "bob_yarn");
    }

    #[test]
    fn test_generated_ids_are_distinct() {
        assert_ne!(OrderId::generate(), OrderId::generate());
        assert_eq!(OrderId::generate().as_str().len(), 32);
    }

    #[test]
    fn test_id_serializes_as_plain_string() {
        let id = ProductId::new("p-1");
        assert_eq!(serde_json::to_string(&id).ok().as_deref(), Some("\"p-1\""));
    }
}
