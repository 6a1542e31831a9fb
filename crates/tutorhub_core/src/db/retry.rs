//! Bounded retry policy for store operations.
//!
//! # Responsibility
//! - Re-run a storage closure when SQLite reports `SQLITE_BUSY`/`SQLITE_LOCKED`.
//! - Surface exhausted contention as `DbError::Contention`.
//!
//! # Invariants
//! - `max_attempts` counts total attempts and is always >= 1.
//! - Non-contention errors are returned on the first failure.

use super::{is_contention_error, DbError};
use log::warn;
use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(50);

/// Retry parameters owned by the persistence collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Duration,
}

impl RetryPolicy {
    /// Creates a policy; `max_attempts` of zero is raised to one.
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Single attempt, no retry.
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    /// Runs `op` until it succeeds, fails with a non-contention error, or the
    /// attempt budget is spent.
    pub fn run<T, E, F>(&self, operation: &str, mut op: F) -> Result<T, E>
    where
        E: Contended,
        F: FnMut() -> Result<T, E>,
    {
        let mut attempt = 1;
        loop {
            let err = match op() {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            let source = err.into_contention()?;
            if attempt >= self.max_attempts {
                warn!(
                    "event=store_retry module=db status=error operation={} attempts={} error_code=contention_exhausted",
                    operation, attempt
                );
                return Err(E::exhausted(attempt, source));
            }
            warn!(
                "event=store_retry module=db status=retry operation={} attempt={} max_attempts={}",
                operation, attempt, self.max_attempts
            );
            attempt += 1;
            if !self.backoff.is_zero() {
                std::thread::sleep(self.backoff);
            }
        }
    }
}

/// Error types that may carry retryable SQLite contention.
pub trait Contended: Sized {
    /// Returns the underlying SQLite error when `self` is retryable contention,
    /// or gives `self` back unchanged.
    fn into_contention(self) -> Result<rusqlite::Error, Self>;

    /// Builds the error reported once the attempt budget is spent.
    fn exhausted(attempts: u32, source: rusqlite::Error) -> Self;
}

impl Contended for DbError {
    /// An exhausted inner run is still contention for an enclosing run.
    fn into_contention(self) -> Result<rusqlite::Error, Self> {
        match self {
            Self::Sqlite(err) if is_contention_error(&err) => Ok(err),
            Self::Contention { source, .. } => Ok(source),
            other => Err(other),
        }
    }

    fn exhausted(attempts: u32, source: rusqlite::Error) -> Self {
        Self::Contention { attempts, source }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_BACKOFF)
    }
}
