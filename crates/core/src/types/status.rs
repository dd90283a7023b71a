//! Status values for orders, enrollments and accounts.
//!
//! Order and enrollment statuses are free text in the document store. The
//! well-known values get their own variants; anything else an operator typed
//! is preserved verbatim in `Other` rather than rejected.

use serde::{Deserialize, Serialize};

/// Order status.
///
/// New orders start as `pending`. The back office may set any non-empty value;
/// no transition graph is enforced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Other(String),
}

impl OrderStatus {
    /// Values offered as suggestions in the back office.
    pub const SUGGESTED: [&'static str; 5] =
        ["pending", "processing", "shipped", "delivered", "cancelled"];

    /// Parse an operator-entered status. Returns `None` for blank input.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        Some(Self::from(value.to_owned()))
    }

    /// The stored string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Other(value) => value,
        }
    }
}

impl From<String> for OrderStatus {
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "pending" => Self::Pending,
            "processing" => Self::Processing,
            "shipped" => Self::Shipped,
            "delivered" => Self::Delivered,
            "cancelled" | "canceled" => Self::Cancelled,
            _ => Self::Other(value),
        }
    }
}

impl From<OrderStatus> for String {
    fn from(status: OrderStatus) -> Self {
        match status {
            OrderStatus::Other(value) => value,
            known => known.as_str().to_owned(),
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Enrollment status.
///
/// Only the exact value `paid` grants access; see [`crate::enrollment`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EnrollmentStatus {
    Paid,
    Other(String),
}

impl EnrollmentStatus {
    /// The stored string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Paid => "paid",
            Self::Other(value) => value,
        }
    }
}

impl From<String> for EnrollmentStatus {
    fn from(value: String) -> Self {
        if value == "paid" {
            Self::Paid
        } else {
            Self::Other(value)
        }
    }
}

impl From<EnrollmentStatus> for String {
    fn from(status: EnrollmentStatus) -> Self {
        match status {
            EnrollmentStatus::Paid => "paid".to_owned(),
            EnrollmentStatus::Other(value) => value,
        }
    }
}

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Shopper and course viewer.
    #[default]
    Customer,
    /// Full access to the back office.
    Admin,
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Customer => write!(f, "customer"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Self::Customer),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_known_values() {
        assert_eq!(OrderStatus::from("Shipped".to_owned()), OrderStatus::Shipped);
        assert_eq!(OrderStatus::from("canceled".to_owned()), OrderStatus::Cancelled);
    }

    #[test]
    fn test_order_status_free_text_is_preserved() {
        let status = OrderStatus::parse("  awaiting courier ");
        assert_eq!(status, Some(OrderStatus::Other("awaiting courier".to_owned())));
        assert_eq!(
            String::from(OrderStatus::Other("awaiting courier".to_owned())),
            "awaiting courier"
        );
    }

    #[test]
    fn test_order_status_blank_is_rejected() {
        assert_eq!(OrderStatus::parse("   "), None);
    }

    #[test]
    fn test_order_status_serde_is_plain_string() {
        let json = serde_json::to_string(&OrderStatus::Processing).ok();
        assert_eq!(json.as_deref(), Some("\"processing\""));
        let parsed: Option<OrderStatus> = serde_json::from_str("\"on hold\"").ok();
        assert_eq!(parsed, Some(OrderStatus::Other("on hold".to_owned())));
    }

    #[test]
    fn test_enrollment_status_is_exact_match() {
        assert_eq!(EnrollmentStatus::from("paid".to_owned()), EnrollmentStatus::Paid);
        assert_eq!(
            EnrollmentStatus::from("Paid".to_owned()),
            EnrollmentStatus::Other("Paid".to_owned())
        );
    }

    #[test]
    fn test_user_role_round_trip() {
        assert_eq!("admin".parse::<UserRole>(), Ok(UserRole::Admin));
        assert_eq!(UserRole::Customer.to_string(), "customer");
        assert!("owner".parse::<UserRole>().is_err());
    }
}
