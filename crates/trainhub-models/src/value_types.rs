//! Validated primitives.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use validator::ValidateEmail;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueTypeError {
    #[error("Invalid email: {0}")]
    InvalidEmail(String),
}

/// An email address, trimmed and lower-cased on construction.
///
/// ```ignore
/// let email: Email = " Marie.Dupont@Example.com ".parse()?;
/// assert_eq!(email.as_str(), "marie.dupont@example.com");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, Serialize, sqlx::Type, ToSchema)]
#[serde(into = "String")]
#[sqlx(transparent)]
#[schema(value_type = String, format = "email", example = "marie.dupont@example.com")]
pub struct Email(String);

impl Email {
    pub fn new(email: impl AsRef<str>) -> Result<Self, ValueTypeError> {
        let normalized = email.as_ref().trim().to_lowercase();

        if normalized.is_empty() {
            return Err(ValueTypeError::InvalidEmail("email cannot be empty".into()));
        }
        if !normalized.validate_email() {
            return Err(ValueTypeError::InvalidEmail(format!(
                "'{}' is not a valid email address",
                normalized
            )));
        }

        Ok(Self(normalized))
    }

    /// Wraps a value read back from the database.
    #[inline]
    pub fn new_unchecked(email: impl Into<String>) -> Self {
        Self(email.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Email({})", self.0)
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Email {
    type Err = ValueTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<Email> for String {
    fn from(email: Email) -> String {
        email.0
    }
}

impl<'de> Deserialize<'de> for Email {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_is_normalized() {
        let email = Email::new("  Jean.Kouassi@Example.COM ").unwrap();
        assert_eq!(email.as_str(), "jean.kouassi@example.com");
    }

    #[test]
    fn test_invalid_emails_are_rejected() {
        assert!(Email::new("").is_err());
        assert!(Email::new("not-an-email").is_err());
        assert!("a@".parse::<Email>().is_err());
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: Email = serde_json::from_str(r#""awa@example.org""#).unwrap();
        assert_eq!(ok, Email::new_unchecked("awa@example.org"));
        assert!(serde_json::from_str::<Email>(r#""broken""#).is_err());
    }

    #[test]
    fn test_serializes_as_string() {
        let email = Email::new("awa@example.org").unwrap();
        assert_eq!(serde_json::to_string(&email).unwrap(), r#""awa@example.org""#);
    }
}
