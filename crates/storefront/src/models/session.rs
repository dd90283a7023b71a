//! Session-related types.
//!
//! Types stored in the device session for authentication state.

use serde::{Deserialize, Serialize};

use knotwork_core::{Email, UserId, UserRole};

use super::{OrderItem, ShippingInfo, UserProfile};

/// Session-stored user identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's profile id.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// Name shown in the header.
    pub display_name: String,
    pub role: UserRole,
}

impl From<&UserProfile> for CurrentUser {
    fn from(profile: &UserProfile) -> Self {
        Self {
            id: profile.id.clone(),
            email: profile.email.clone(),
            display_name: profile.greeting_name().to_owned(),
            role: profile.role,
        }
    }
}

/// Shipping details and the priced lines carried from the checkout form to
/// payment confirmation. The order is recorded from these lines, not from
/// whatever the cart holds at confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCheckout {
    pub shipping: ShippingInfo,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    pub amount_minor: i64,
}

/// Session keys for authentication and checkout data.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for this device's copy of its sign-in token.
    pub const SESSION_TOKEN: &str = "session_token";

    /// Key for the checkout in progress.
    pub const PENDING_CHECKOUT: &str = "pending_checkout";
}
