//! Email identity shared by tutors and students.
//!
//! # Responsibility
//! - Define the single email shape accepted by core.
//! - Provide an ordered, hashable identity for set arithmetic.
//!
//! # Invariants
//! - An `Email` always matches `EMAIL_SHAPE`.
//! - Equality is exact and case-sensitive: `A@x.com != a@x.com`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Local part, `@`, then at least two dot-separated domain labels.
static EMAIL_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(?:\.[A-Za-z0-9\-]+)+$")
        .expect("valid email regex")
});

/// Deduplicated set of account identities.
///
/// `BTreeSet` keeps recipient and student lists in a stable order.
pub type EmailSet = BTreeSet<Email>;

/// Rejected email input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailError {
    pub value: String,
}

impl Display for EmailError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid email: `{}`", self.value)
    }
}

impl Error for EmailError {}

/// Validated account identity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Parses an email, rejecting anything outside the accepted shape.
    ///
    /// Input is not trimmed or case-folded.
    pub fn parse(value: impl Into<String>) -> Result<Self, EmailError> {
        let value = value.into();
        if is_email_shaped(&value) {
            Ok(Self(value))
        } else {
            Err(EmailError { value })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Portion before `@`, used in notification titles and status messages.
    pub fn local_part(&self) -> &str {
        self.0.split('@').next().unwrap_or_default()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl Display for Email {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Email {
    type Error = EmailError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl TryFrom<&str> for Email {
    type Error = EmailError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Email> for String {
    fn from(value: Email) -> Self {
        value.0
    }
}

/// Returns whether `value` as a whole matches the accepted email shape.
pub fn is_email_shaped(value: &str) -> bool {
    EMAIL_SHAPE.is_match(value)
}

/// Converts a set of identities into plain strings, preserving set order.
pub fn to_strings(emails: &EmailSet) -> Vec<String> {
    emails.iter().map(|email| email.as_str().to_string()).collect()
}
