//! Tutor and student account records.
//!
//! # Responsibility
//! - Describe persisted account rows and the tutor/student link.
//!
//! # Invariants
//! - Accounts are identified only by `Email`; there is no surrogate key.
//! - `suspended` gates notification delivery, never roster membership.

use crate::model::email::Email;
use serde::{Deserialize, Serialize};

/// Registered tutor account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tutor {
    pub email: Email,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

/// Registered student account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub email: Email,
    /// Suspended students never receive notifications.
    pub suspended: bool,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds, bumped on suspension changes.
    pub updated_at: i64,
}

impl Student {
    /// Returns whether this student may receive notifications.
    pub fn is_reachable(&self) -> bool {
        !self.suspended
    }
}

/// Link between one tutor and one student.
///
/// `active` is informational only; no core rule reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TutorStudent {
    pub tutor: Email,
    pub student: Email,
    pub active: Option<bool>,
}
