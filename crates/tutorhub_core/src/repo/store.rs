//! SQLite-backed tutoring store and shared repository errors.
//!
//! # Responsibility
//! - Own the connection handle and retry policy used by every repository impl.
//! - Verify the connection carries the expected schema before use.
//! - Provide transactional units of work and full-store teardown.
//!
//! # Invariants
//! - Store writes run under the configured `RetryPolicy`.
//! - `clear_all` removes children before parents so foreign keys hold.

use crate::db::{Contended, DbError, RetryPolicy};
use log::info;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Tables a store connection must expose, in teardown order.
const REQUIRED_TABLES: &[(&str, &[&str])] = &[
    (
        "student_notifications",
        &["id", "tutor", "student", "title", "message", "created_at"],
    ),
    ("tutor_students", &["tutor", "student", "active"]),
    ("students", &["email", "suspended", "created_at", "updated_at"]),
    ("tutors", &["email", "created_at"]),
];

/// Repository error for account and notification persistence.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound { entity: &'static str, key: String },
    InvalidData(String),
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl RepoError {
    pub(crate) fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            key: key.into(),
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, key } => write!(f, "{entity} not found: {key}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "store connection is missing table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "store table `{table}` is missing column `{column}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl Contended for RepoError {
    fn into_contention(self) -> Result<rusqlite::Error, Self> {
        match self {
            Self::Db(err) => err.into_contention().map_err(Self::Db),
            other => Err(other),
        }
    }

    fn exhausted(attempts: u32, source: rusqlite::Error) -> Self {
        Self::Db(DbError::exhausted(attempts, source))
    }
}

/// Runs several repository calls as one all-or-nothing unit.
pub trait UnitOfWork {
    /// Executes `work` inside one transaction, committing only when it returns
    /// `Ok`.
    ///
    /// Statements inside `work` get no retry of their own; on store contention
    /// the whole unit is rolled back and re-run under the store's policy.
    fn atomically<T, F>(&self, operation: &'static str, work: F) -> RepoResult<T>
    where
        F: FnMut(&Self) -> RepoResult<T>;
}

/// SQLite store implementing every repository contract.
///
/// Cheap to copy: it only borrows the connection.
#[derive(Debug, Clone, Copy)]
pub struct SqliteTutoringStore<'conn> {
    pub(crate) conn: &'conn Connection,
    pub(crate) retry: RetryPolicy,
}

impl<'conn> SqliteTutoringStore<'conn> {
    /// Constructs a store over a migrated connection with the default retry policy.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        Self::with_retry(conn, RetryPolicy::default())
    }

    /// Constructs a store with an explicit retry policy.
    pub fn with_retry(conn: &'conn Connection, retry: RetryPolicy) -> RepoResult<Self> {
        ensure_store_connection_ready(conn)?;
        Ok(Self { conn, retry })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Deletes every notification, link, student and tutor row.
    ///
    /// Returns the total number of deleted rows.
    pub fn clear_all(&self) -> RepoResult<usize> {
        self.atomically("clear_all", |store| {
            let mut deleted = 0;
            for &(table, _) in REQUIRED_TABLES {
                deleted += store.conn.execute(&format!("DELETE FROM {table};"), [])?;
            }
            Ok(deleted)
        })
        .inspect(|deleted| {
            info!("event=store_clear module=repo status=ok deleted_rows={deleted}");
        })
    }
}

impl UnitOfWork for SqliteTutoringStore<'_> {
    fn atomically<T, F>(&self, operation: &'static str, mut work: F) -> RepoResult<T>
    where
        F: FnMut(&Self) -> RepoResult<T>,
    {
        let unit = Self {
            conn: self.conn,
            retry: RetryPolicy::no_retry(),
        };
        self.retry.run(operation, || {
            let tx = self.conn.unchecked_transaction()?;
            let value = work(&unit)?;
            tx.commit()?;
            Ok(value)
        })
    }
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

pub(crate) fn int_to_bool(table: &str, column: &str, value: i64) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid {column} value `{other}` in {table}.{column}"
        ))),
    }
}

fn ensure_store_connection_ready(conn: &Connection) -> RepoResult<()> {
    for &(table, columns) in REQUIRED_TABLES {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
        for &column in columns {
            if !table_has_column(conn, table, column)? {
                return Err(RepoError::MissingRequiredColumn { table, column });
            }
        }
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
