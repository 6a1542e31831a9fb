//! Roster use-case service.
//!
//! # Responsibility
//! - Register students under a tutor with find-or-create semantics.
//! - Resolve students shared by every tutor in a query.
//! - Suspend student accounts.
//!
//! # Invariants
//! - Registration is idempotent per email and runs as one unit of work.
//! - Common-student resolution ignores suspension.
//! - Suspending an unknown student mutates nothing.

use crate::model::email::{Email, EmailSet};
use crate::repo::account_repo::AccountRepository;
use crate::repo::store::{RepoError, RepoResult, UnitOfWork};
use log::info;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const STUDENTS_REGISTERED_MESSAGE: &str = "Students Registered";

/// Errors from roster operations.
#[derive(Debug)]
pub enum RosterServiceError {
    /// Referenced account does not exist.
    AccountNotFound(Email),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for RosterServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AccountNotFound(email) => write!(f, "account not found: {email}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RosterServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::AccountNotFound(_) => None,
        }
    }
}

impl From<RepoError> for RosterServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Result of a registration call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub tutor: Email,
    /// Distinct students linked by this call, sorted.
    pub students: Vec<Email>,
    pub message: String,
}

/// Result of a suspension call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suspension {
    pub student: Email,
    pub message: String,
}

/// Roster service facade over repository implementations.
pub struct RosterService<R> {
    repo: R,
}

impl<R: AccountRepository> RosterService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Students linked to *every* tutor in `tutors`.
    ///
    /// Duplicates in `tutors` are ignored. An empty slice, or any tutor
    /// without students (including unregistered ones), yields an empty set.
    pub fn common_students(&self, tutors: &[Email]) -> RepoResult<EmailSet> {
        let distinct: BTreeSet<&Email> = tutors.iter().collect();
        let mut common: Option<EmailSet> = None;

        for tutor in &distinct {
            let students: EmailSet = self
                .repo
                .list_students_of_tutor(tutor)?
                .into_iter()
                .map(|student| student.email)
                .collect();

            let narrowed = match common {
                None => students,
                Some(current) => current.intersection(&students).cloned().collect(),
            };
            if narrowed.is_empty() {
                info!(
                    "event=common_students module=service status=ok tutors={} students=0",
                    distinct.len()
                );
                return Ok(EmailSet::new());
            }
            common = Some(narrowed);
        }

        let common = common.unwrap_or_default();
        info!(
            "event=common_students module=service status=ok tutors={} students={}",
            distinct.len(),
            common.len()
        );
        Ok(common)
    }

    /// Marks a student as suspended.
    ///
    /// Suspending an already suspended student succeeds again.
    pub fn suspend_student(&self, student: &Email) -> Result<Suspension, RosterServiceError> {
        self.repo
            .set_student_suspended(student, true)
            .map_err(|err| match err {
                RepoError::NotFound { .. } => {
                    info!("event=student_suspend module=service status=error error_code=account_not_found");
                    RosterServiceError::AccountNotFound(student.clone())
                }
                other => RosterServiceError::Repo(other),
            })?;

        info!("event=student_suspend module=service status=ok");
        Ok(Suspension {
            student: student.clone(),
            message: suspension_message(student),
        })
    }
}

impl<R: AccountRepository + UnitOfWork> RosterService<R> {
    /// Registers `students` under `tutor`, creating any missing accounts.
    ///
    /// # Contract
    /// - Known tutors/students are reused, never duplicated.
    /// - Already linked pairs stay linked; the call still succeeds.
    /// - Either every account and link is written, or none is.
    pub fn register_students(
        &self,
        tutor: &Email,
        students: &[Email],
    ) -> Result<Registration, RosterServiceError> {
        let distinct: EmailSet = students.iter().cloned().collect();

        self.repo.atomically("register_students", |repo| {
            repo.find_or_create_tutor(tutor)?;
            for student in &distinct {
                repo.find_or_create_student(student)?;
                repo.link_student(tutor, student, Some(true))?;
            }
            Ok(())
        })?;

        info!(
            "event=students_register module=service status=ok students={}",
            distinct.len()
        );
        Ok(Registration {
            tutor: tutor.clone(),
            students: distinct.into_iter().collect(),
            message: STUDENTS_REGISTERED_MESSAGE.to_string(),
        })
    }
}

/// Status message reported after a suspension.
pub fn suspension_message(student: &Email) -> String {
    format!("{} has been suspended", student.local_part())
}
