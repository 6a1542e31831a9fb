//! Notification fan-out service.
//!
//! # Responsibility
//! - Resolve the recipient set of a tutor notification.
//! - Persist one notification row per recipient.
//!
//! # Invariants
//! - Recipients = reachable students of the tutor ∪ reachable mentioned
//!   students, deduplicated by email.
//! - Suspended students are never recipients.
//! - Unknown tutors fail before any write.
//! - Rows for one call are written all-or-nothing and share one timestamp.

use crate::mention::extract_mentions;
use crate::model::email::{Email, EmailSet};
use crate::model::notification::StudentNotification;
use crate::repo::account_repo::AccountRepository;
use crate::repo::notification_repo::{NotificationListQuery, NotificationRepository};
use crate::repo::store::{RepoError, RepoResult};
use crate::service::student_status::{
    unsuspended_students_by_emails, unsuspended_students_by_tutor,
};
use chrono::{DateTime, Utc};
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const NOTIFICATION_POSTED_MESSAGE: &str = "Notification posted";

/// Errors from notification fan-out.
#[derive(Debug)]
pub enum NotificationServiceError {
    /// Sending tutor is not registered.
    AccountNotFound(Email),
    /// Persistence-layer failure; no rows were kept.
    Repo(RepoError),
}

impl Display for NotificationServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AccountNotFound(email) => write!(f, "account not found: {email}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for NotificationServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::AccountNotFound(_) => None,
        }
    }
}

impl From<RepoError> for NotificationServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Outcome of a successful fan-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationReceipt {
    pub tutor: Email,
    /// Every recipient, sorted. Empty when nobody qualified.
    pub recipients: Vec<Email>,
    pub message: String,
}

/// Recipient breakdown before deduplication, mostly for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipientPlan {
    pub direct: EmailSet,
    pub mentioned: EmailSet,
}

impl RecipientPlan {
    /// Union of direct and mentioned recipients.
    pub fn recipients(&self) -> EmailSet {
        self.direct.union(&self.mentioned).cloned().collect()
    }
}

/// Notification service facade over repository implementations.
pub struct NotificationService<R> {
    repo: R,
}

impl<R> NotificationService<R>
where
    R: AccountRepository + NotificationRepository,
{
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Posts `message` from `tutor`, stamped with the current time.
    pub fn post_notification(
        &self,
        tutor: &Email,
        message: &str,
    ) -> Result<NotificationReceipt, NotificationServiceError> {
        self.post_notification_at(tutor, message, Utc::now())
    }

    /// Posts `message` from `tutor` using `generated_at` for every title.
    ///
    /// # Contract
    /// - Unknown tutor -> `AccountNotFound`, nothing written.
    /// - Zero recipients is a successful post.
    /// - A failed insert fails the whole call and keeps no rows.
    pub fn post_notification_at(
        &self,
        tutor: &Email,
        message: &str,
        generated_at: DateTime<Utc>,
    ) -> Result<NotificationReceipt, NotificationServiceError> {
        let plan = self.plan_recipients(tutor, message)?;
        let recipients = plan.recipients();

        let records: Vec<StudentNotification> = recipients
            .iter()
            .map(|student| StudentNotification::new(tutor, student, message, generated_at))
            .collect();

        let created = self.repo.create_notifications(&records).map_err(|err| {
            error!(
                "event=notification_post module=service status=error recipients={} error={}",
                records.len(),
                err
            );
            err
        })?;

        info!(
            "event=notification_post module=service status=ok direct={} mentioned={} recipients={} created={} message_chars={}",
            plan.direct.len(),
            plan.mentioned.len(),
            recipients.len(),
            created,
            message.chars().count()
        );

        Ok(NotificationReceipt {
            tutor: tutor.clone(),
            recipients: recipients.into_iter().collect(),
            message: NOTIFICATION_POSTED_MESSAGE.to_string(),
        })
    }

    /// Resolves who would receive `message` from `tutor` without writing.
    pub fn plan_recipients(
        &self,
        tutor: &Email,
        message: &str,
    ) -> Result<RecipientPlan, NotificationServiceError> {
        if self.repo.find_tutor(tutor)?.is_none() {
            info!("event=notification_post module=service status=error error_code=account_not_found");
            return Err(NotificationServiceError::AccountNotFound(tutor.clone()));
        }

        let candidates = extract_mentions(message);
        let direct = unsuspended_students_by_tutor(&self.repo, tutor)?;
        let mentioned = unsuspended_students_by_emails(&self.repo, &candidates)?;

        Ok(RecipientPlan { direct, mentioned })
    }

    /// Lists persisted notifications.
    pub fn list_notifications(
        &self,
        query: &NotificationListQuery,
    ) -> RepoResult<Vec<StudentNotification>> {
        self.repo.list_notifications(query)
    }
}
