//! Student notification record.
//!
//! # Responsibility
//! - Define the immutable per-recipient notification row.
//! - Derive the notification title from tutor and generation time.
//!
//! # Invariants
//! - `id` is generated once and never reused.
//! - `message` is stored verbatim.

use crate::model::email::Email;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type NotificationId = Uuid;

/// One persisted notification for one student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentNotification {
    pub id: NotificationId,
    pub tutor: Email,
    pub student: Email,
    pub title: String,
    pub message: String,
    /// Unix epoch milliseconds of title generation.
    pub created_at: i64,
}

impl StudentNotification {
    /// Builds a new record addressed to `student` with a fresh id.
    pub fn new(
        tutor: &Email,
        student: &Email,
        message: impl Into<String>,
        generated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tutor: tutor.clone(),
            student: student.clone(),
            title: notification_title(tutor, generated_at),
            message: message.into(),
            created_at: generated_at.timestamp_millis(),
        }
    }
}

/// Title shown to students: `[Tutor <local-part>]: <RFC 3339 time>`.
pub fn notification_title(tutor: &Email, generated_at: DateTime<Utc>) -> String {
    format!(
        "[Tutor {}]: {}",
        tutor.local_part(),
        generated_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    )
}
