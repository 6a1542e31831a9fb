//! Request/response boundary for TutorHub entry points.
//!
//! # Responsibility
//! - Validate raw request fields before they reach services.
//! - Translate service outcomes into stable response envelopes.
//!
//! # Invariants
//! - Functions here never panic and never return `Err`; every failure is an
//!   envelope with a non-200 `code`.
//! - Collection payloads are always present, possibly empty.
//! - Validation stops at the first failing field.

use crate::db::RetryPolicy;
use crate::model::email::{to_strings, Email};
use crate::model::notification::StudentNotification;
use crate::repo::notification_repo::NotificationListQuery;
use crate::repo::store::{RepoError, RepoResult, SqliteTutoringStore};
use crate::service::notification_service::{NotificationService, NotificationServiceError};
use crate::service::roster_service::{RosterService, RosterServiceError};
use log::{info, warn};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const STATUS_OK: u16 = 200;
pub const STATUS_BAD_REQUEST: u16 = 400;
pub const STATUS_INTERNAL_ERROR: u16 = 500;

pub const VALIDATION_FAILED_MESSAGE: &str = "Validation Failed";
pub const ACCOUNT_NOT_FOUND_MESSAGE: &str = "An account could not be found";
pub const COMMON_STUDENTS_MESSAGE: &str = "Common students retrieved";
pub const NOTIFICATIONS_LISTED_MESSAGE: &str = "Notifications retrieved";

/// One `{field: reason}` validation entry.
pub type ValidationDetail = BTreeMap<String, String>;

/// Response envelope shared by every boundary operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiResponse<T> {
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<ValidationDetail>,
    #[serde(flatten)]
    pub data: T,
}

impl<T> ApiResponse<T> {
    fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            code: STATUS_OK,
            message: message.into(),
            details: Vec::new(),
            data,
        }
    }

    fn failure(code: u16, message: impl Into<String>, data: T) -> Self {
        Self {
            code,
            message: message.into(),
            details: Vec::new(),
            data,
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == STATUS_OK
    }
}

impl<T: Default> ApiResponse<T> {
    fn validation_failed(detail: FieldError) -> Self {
        Self {
            code: STATUS_BAD_REQUEST,
            message: VALIDATION_FAILED_MESSAGE.to_string(),
            details: vec![BTreeMap::from([(detail.field, detail.reason)])],
            data: T::default(),
        }
    }
}

/// Empty payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NoData {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StudentsData {
    pub students: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecipientsData {
    pub tutor: String,
    pub recipients: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NotificationsData {
    pub notifications: Vec<StudentNotification>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RegisterRequest {
    pub tutor: Option<String>,
    pub students: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CommonStudentsRequest {
    #[serde(default)]
    pub tutor: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SuspendRequest {
    pub student: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RetrieveNotificationsRequest {
    pub tutor: Option<String>,
    pub notification: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ListNotificationsRequest {
    pub tutor: Option<String>,
    pub student: Option<String>,
    pub limit: Option<u32>,
}

struct FieldError {
    field: String,
    reason: String,
}

impl FieldError {
    fn required(field: &str) -> Self {
        Self {
            field: field.to_string(),
            reason: format!("\"{field}\" is required"),
        }
    }

    fn invalid_email(field: &str, label: &str) -> Self {
        Self {
            field: field.to_string(),
            reason: format!("\"{label}\" must be a valid email"),
        }
    }
}

/// Boundary facade bound to one open connection.
pub struct TutoringApi<'conn> {
    store: SqliteTutoringStore<'conn>,
}

impl<'conn> TutoringApi<'conn> {
    /// Binds the boundary to a migrated connection.
    pub fn try_new(conn: &'conn Connection, retry: RetryPolicy) -> RepoResult<Self> {
        Ok(Self {
            store: SqliteTutoringStore::with_retry(conn, retry)?,
        })
    }

    /// Registers students under a tutor (find-or-create for every email).
    pub fn register(&self, request: &RegisterRequest) -> ApiResponse<NoData> {
        let validated = required_email(request.tutor.as_deref(), "tutor").and_then(|tutor| {
            let students = required_email_list(request.students.as_deref(), "students")?;
            Ok((tutor, students))
        });
        let (tutor, students) = match validated {
            Ok(values) => values,
            Err(detail) => return rejected("register", detail),
        };

        let response = match RosterService::new(self.store).register_students(&tutor, &students)
        {
            Ok(registration) => ApiResponse::ok(registration.message, NoData {}),
            Err(err) => roster_failure(err, NoData {}),
        };
        respond("register", response)
    }

    /// Students shared by every tutor in the request.
    ///
    /// Never fails validation: blank or malformed tutors cannot exist, so they
    /// make the result empty.
    pub fn common_students(&self, request: &CommonStudentsRequest) -> ApiResponse<StudentsData> {
        let tutors: Option<Vec<Email>> = request
            .tutor
            .iter()
            .map(|value| Email::parse(value.trim()).ok())
            .collect();

        let response = match tutors {
            None => ApiResponse::ok(COMMON_STUDENTS_MESSAGE, StudentsData::default()),
            Some(tutors) => match RosterService::new(self.store).common_students(&tutors) {
                Ok(students) => ApiResponse::ok(
                    COMMON_STUDENTS_MESSAGE,
                    StudentsData {
                        students: to_strings(&students),
                    },
                ),
                Err(err) => store_failure(err, StudentsData::default()),
            },
        };
        respond("common_students", response)
    }

    /// Suspends one student account.
    pub fn suspend(&self, request: &SuspendRequest) -> ApiResponse<NoData> {
        let student = match required_email(request.student.as_deref(), "student") {
            Ok(student) => student,
            Err(detail) => return rejected("suspend", detail),
        };

        let response = match RosterService::new(self.store).suspend_student(&student) {
            Ok(suspension) => ApiResponse::ok(suspension.message, NoData {}),
            Err(err) => roster_failure(err, NoData {}),
        };
        respond("suspend", response)
    }

    /// Fans a notification out to the tutor's students and mentioned students.
    pub fn retrieve_notifications(
        &self,
        request: &RetrieveNotificationsRequest,
    ) -> ApiResponse<RecipientsData> {
        let validated = required_email(request.tutor.as_deref(), "tutor").and_then(|tutor| {
            let notification = required_text(request.notification.as_deref(), "notification")?;
            Ok((tutor, notification))
        });
        let (tutor, notification) = match validated {
            Ok(values) => values,
            Err(detail) => return rejected("retrieve_notifications", detail),
        };

        let service = NotificationService::new(self.store);
        let response = match service.post_notification(&tutor, notification) {
            Ok(receipt) => ApiResponse::ok(
                receipt.message,
                RecipientsData {
                    tutor: receipt.tutor.into_string(),
                    recipients: receipt.recipients.into_iter().map(Email::into_string).collect(),
                },
            ),
            Err(err) => {
                let data = RecipientsData {
                    tutor: tutor.as_str().to_string(),
                    recipients: Vec::new(),
                };
                match err {
                    NotificationServiceError::AccountNotFound(_) => {
                        ApiResponse::failure(STATUS_BAD_REQUEST, ACCOUNT_NOT_FOUND_MESSAGE, data)
                    }
                    NotificationServiceError::Repo(err) => store_failure(err, data),
                }
            }
        };
        respond("retrieve_notifications", response)
    }

    /// Lists stored notifications, optionally filtered by tutor and/or student.
    pub fn list_notifications(
        &self,
        request: &ListNotificationsRequest,
    ) -> ApiResponse<NotificationsData> {
        let validated = optional_email(request.tutor.as_deref(), "tutor").and_then(|tutor| {
            let student = optional_email(request.student.as_deref(), "student")?;
            Ok((tutor, student))
        });
        let (tutor, student) = match validated {
            Ok(values) => values,
            Err(detail) => return rejected("list_notifications", detail),
        };

        let query = NotificationListQuery {
            tutor,
            student,
            limit: request.limit,
        };
        let response = match NotificationService::new(self.store).list_notifications(&query) {
            Ok(notifications) => ApiResponse::ok(
                NOTIFICATIONS_LISTED_MESSAGE,
                NotificationsData { notifications },
            ),
            Err(err) => store_failure(err, NotificationsData::default()),
        };
        respond("list_notifications", response)
    }
}

fn required_email(value: Option<&str>, field: &str) -> Result<Email, FieldError> {
    let value = value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| FieldError::required(field))?;
    Email::parse(value).map_err(|_| FieldError::invalid_email(field, field))
}

fn optional_email(value: Option<&str>, field: &str) -> Result<Option<Email>, FieldError> {
    match value.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => Email::parse(value)
            .map(Some)
            .map_err(|_| FieldError::invalid_email(field, field)),
        None => Ok(None),
    }
}

fn required_email_list(values: Option<&[String]>, field: &str) -> Result<Vec<Email>, FieldError> {
    let values = values
        .filter(|values| !values.is_empty())
        .ok_or_else(|| FieldError::required(field))?;
    values
        .iter()
        .enumerate()
        .map(|(index, value)| {
            Email::parse(value.trim())
                .map_err(|_| FieldError::invalid_email(field, &format!("{field}[{index}]")))
        })
        .collect()
}

fn required_text<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, FieldError> {
    value
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| FieldError::required(field))
}

fn rejected<T: Default>(operation: &str, detail: FieldError) -> ApiResponse<T> {
    info!(
        "event=api_request module=api operation={} status=rejected code={} field={}",
        operation, STATUS_BAD_REQUEST, detail.field
    );
    ApiResponse::validation_failed(detail)
}

fn roster_failure<T>(err: RosterServiceError, data: T) -> ApiResponse<T> {
    match err {
        RosterServiceError::AccountNotFound(_) => {
            ApiResponse::failure(STATUS_BAD_REQUEST, ACCOUNT_NOT_FOUND_MESSAGE, data)
        }
        RosterServiceError::Repo(err) => store_failure(err, data),
    }
}

fn store_failure<T>(err: RepoError, data: T) -> ApiResponse<T> {
    warn!(
        "event=api_request module=api status=error code={} error={}",
        STATUS_INTERNAL_ERROR, err
    );
    ApiResponse::failure(STATUS_INTERNAL_ERROR, err.to_string(), data)
}

fn respond<T>(operation: &str, response: ApiResponse<T>) -> ApiResponse<T> {
    info!(
        "event=api_request module=api operation={} status={} code={}",
        operation,
        if response.is_success() { "ok" } else { "error" },
        response.code
    );
    response
}
