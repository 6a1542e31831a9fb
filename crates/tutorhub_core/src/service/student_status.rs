//! Student status lookup.
//!
//! Narrows candidate students down to accounts that may receive notifications.
//! Both lookups are read-only.

use crate::model::account::Student;
use crate::model::email::{Email, EmailSet};
use crate::repo::account_repo::AccountRepository;
use crate::repo::store::RepoResult;

/// Non-suspended students linked to `tutor`.
///
/// Unknown tutors and tutors without students yield an empty set.
pub fn unsuspended_students_by_tutor<R>(repo: &R, tutor: &Email) -> RepoResult<EmailSet>
where
    R: AccountRepository + ?Sized,
{
    Ok(reachable(repo.list_students_of_tutor(tutor)?))
}

/// Candidates that exist as students and are not suspended.
///
/// Unknown emails are dropped silently.
pub fn unsuspended_students_by_emails<R>(repo: &R, candidates: &EmailSet) -> RepoResult<EmailSet>
where
    R: AccountRepository + ?Sized,
{
    if candidates.is_empty() {
        return Ok(EmailSet::new());
    }
    Ok(reachable(repo.find_students(candidates)?))
}

fn reachable(students: Vec<Student>) -> EmailSet {
    students
        .into_iter()
        .filter(Student::is_reachable)
        .map(|student| student.email)
        .collect()
}
