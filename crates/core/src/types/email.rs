//! Sign-in email addresses.
//!
//! The email is the account key: credentials are stored under it and the
//! back office grants roles by it. Two spellings of the same address must
//! land on the same account, so parsing trims and lowercases.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Why an address was refused.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    #[error("email cannot be empty")]
    Empty,
    #[error("email must be at most {0} characters")]
    TooLong(usize),
    #[error("email cannot contain spaces")]
    Whitespace,
    /// Not exactly one `@` with text on both sides.
    #[error("email must look like name@domain")]
    Malformed,
}

/// A normalized account email.
///
/// ```
/// use knotwork_core::Email;
///
/// let email = Email::parse(" Maker@Example.COM ").unwrap();
/// assert_eq!(email.as_str(), "maker@example.com");
/// assert_eq!(email.local_part(), "maker");
/// assert!(Email::parse("maker@").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// RFC 5321 path limit.
    pub const MAX_LEN: usize = 254;

    /// Parse and normalize an address.
    ///
    /// # Errors
    ///
    /// Returns `EmailError` if the address is blank, too long, contains
    /// whitespace, or does not split into `local@domain`.
    pub fn parse(input: &str) -> Result<Self, EmailError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(EmailError::Empty);
        }
        if trimmed.len() > Self::MAX_LEN {
            return Err(EmailError::TooLong(Self::MAX_LEN));
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(EmailError::Whitespace);
        }

        match trimmed.split_once('@') {
            Some((local, domain))
                if !local.is_empty() && !domain.is_empty() && !domain.contains('@') =>
            {
                Ok(Self(trimmed.to_lowercase()))
            }
            _ => Err(EmailError::Malformed),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The part before `@`, used as a fallback display name.
    #[must_use]
    pub fn local_part(&self) -> &str {
        self.0.split_once('@').map_or(self.0.as_str(), |(local, _)| local)
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Email {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Email {
    type Error = EmailError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_same_account_for_any_spelling() {
        let a = Email::parse("  Knitter@Example.com\n").unwrap();
        let b = Email::parse("knitter@example.com").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "knitter@example.com");
    }

    #[test]
    fn test_rejects() {
        assert_eq!(Email::parse("   "), Err(EmailError::Empty));
        assert_eq!(Email::parse("no-at-symbol"), Err(EmailError::Malformed));
        assert_eq!(Email::parse("@domain.com"), Err(EmailError::Malformed));
        assert_eq!(Email::parse("user@"), Err(EmailError::Malformed));
        assert_eq!(Email::parse("a@b@c"), Err(EmailError::Malformed));
        assert_eq!(Email::parse("jo smith@x.in"), Err(EmailError::Whitespace));

        let long = format!("{}@example.com", "a".repeat(250));
        assert_eq!(Email::parse(&long), Err(EmailError::TooLong(254)));
    }

    #[test]
    fn test_stored_form_is_revalidated() {
        let email: Email = serde_json::from_str("\"Maker@Example.com\"").unwrap();
        assert_eq!(serde_json::to_string(&email).unwrap(), "\"maker@example.com\"");
        assert!(serde_json::from_str::<Email>("\"nope\"").is_err());
    }

    #[test]
    fn test_local_part() {
        let email: Email = "asha.rao+yarn@example.com".parse().unwrap();
        assert_eq!(email.local_part(), "asha.rao+yarn");
    }
}
