//! Session-stored operator identity.

use serde::{Deserialize, Serialize};

use knotwork_core::{Email, UserId};
use knotwork_storefront::models::UserProfile;

/// The signed-in operator.
///
/// Only accounts whose profile role is `admin` get one of these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentAdmin {
    pub id: UserId,
    pub email: Email,
    pub name: String,
}

impl From<&UserProfile> for CurrentAdmin {
    fn from(profile: &UserProfile) -> Self {
        Self {
            id: profile.id.clone(),
            email: profile.email.clone(),
            name: profile.greeting_name().to_owned(),
        }
    }
}

/// Session keys for admin authentication data.
pub mod session_keys {
    /// The current logged-in operator.
    pub const CURRENT_ADMIN: &str = "current_admin";
}
