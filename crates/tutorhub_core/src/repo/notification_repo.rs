//! Notification repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist fan-out notification rows.
//! - List persisted notifications for a tutor and/or student.
//!
//! # Invariants
//! - `create_notifications` is all-or-nothing: one insert per record inside a
//!   single transaction.
//! - Notification rows are never updated.

use crate::model::email::Email;
use crate::model::notification::StudentNotification;
use crate::repo::store::{RepoError, RepoResult, SqliteTutoringStore};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Row};
use uuid::Uuid;

const NOTIFICATIONS_DEFAULT_LIMIT: u32 = 50;
const NOTIFICATIONS_LIMIT_MAX: u32 = 500;

const NOTIFICATION_SELECT_SQL: &str = "SELECT
    id,
    tutor,
    student,
    title,
    message,
    created_at
FROM student_notifications";

/// Query options for listing notifications.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationListQuery {
    /// Only rows sent by this tutor.
    pub tutor: Option<Email>,
    /// Only rows addressed to this student.
    pub student: Option<Email>,
    /// Maximum rows to return. Defaults to 50 and clamps to 500.
    pub limit: Option<u32>,
}

/// Repository interface for notification persistence.
pub trait NotificationRepository {
    /// Inserts every record or none of them. Returns the number inserted.
    fn create_notifications(&self, records: &[StudentNotification]) -> RepoResult<usize>;
    /// Lists rows ordered by `created_at DESC, id ASC`.
    fn list_notifications(
        &self,
        query: &NotificationListQuery,
    ) -> RepoResult<Vec<StudentNotification>>;
}

impl NotificationRepository for SqliteTutoringStore<'_> {
    fn create_notifications(&self, records: &[StudentNotification]) -> RepoResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        self.retry.run("create_notifications", || {
            let tx = self.conn.unchecked_transaction()?;
            {
                let mut stmt = tx.prepare_cached(
                    "INSERT INTO student_notifications (
                        id,
                        tutor,
                        student,
                        title,
                        message,
                        created_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
                )?;
                for record in records {
                    stmt.execute(params![
                        record.id.to_string(),
                        record.tutor.as_str(),
                        record.student.as_str(),
                        record.title.as_str(),
                        record.message.as_str(),
                        record.created_at,
                    ])?;
                }
            }
            tx.commit()?;
            Ok::<_, RepoError>(records.len())
        })
    }

    fn list_notifications(
        &self,
        query: &NotificationListQuery,
    ) -> RepoResult<Vec<StudentNotification>> {
        let mut sql = format!("{NOTIFICATION_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(tutor) = query.tutor.as_ref() {
            sql.push_str(" AND tutor = ?");
            bind_values.push(Value::Text(tutor.as_str().to_string()));
        }
        if let Some(student) = query.student.as_ref() {
            sql.push_str(" AND student = ?");
            bind_values.push(Value::Text(student.as_str().to_string()));
        }

        sql.push_str(" ORDER BY created_at DESC, id ASC LIMIT ?");
        bind_values.push(Value::Integer(i64::from(normalize_notification_limit(
            query.limit,
        ))));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut notifications = Vec::new();
        while let Some(row) = rows.next()? {
            notifications.push(parse_notification_row(row)?);
        }
        Ok(notifications)
    }
}

/// Normalizes list limit according to the notification listing contract.
pub fn normalize_notification_limit(limit: Option<u32>) -> u32 {
    match limit {
        Some(0) | None => NOTIFICATIONS_DEFAULT_LIMIT,
        Some(value) => value.min(NOTIFICATIONS_LIMIT_MAX),
    }
}

fn parse_notification_row(row: &Row<'_>) -> RepoResult<StudentNotification> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid uuid value `{id_text}` in student_notifications.id"
        ))
    })?;

    Ok(StudentNotification {
        id,
        tutor: parse_column_email(row, "tutor")?,
        student: parse_column_email(row, "student")?,
        title: row.get("title")?,
        message: row.get("message")?,
        created_at: row.get("created_at")?,
    })
}

fn parse_column_email(row: &Row<'_>, column: &str) -> RepoResult<Email> {
    let value: String = row.get(column)?;
    Email::parse(value).map_err(|err| {
        RepoError::InvalidData(format!(
            "invalid email `{}` in student_notifications.{column}",
            err.value
        ))
    })
}
