//! Tutor/student repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide typed lookups of tutors, students and their links by email.
//! - Provide idempotent find-or-create writes for registration.
//!
//! # Invariants
//! - Every lookup is keyed by exact email match.
//! - Find-or-create never fails because a row already exists.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::model::account::{Student, Tutor, TutorStudent};
use crate::model::email::{Email, EmailSet};
use crate::repo::store::{bool_to_int, int_to_bool, RepoError, RepoResult, SqliteTutoringStore};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};

const STUDENT_SELECT_SQL: &str = "SELECT
    s.email,
    s.suspended,
    s.created_at,
    s.updated_at
FROM students s";

/// Upper bound of bound parameters per `IN (...)` query.
const EMAIL_LOOKUP_CHUNK: usize = 500;

/// Repository interface for account lookups and registration writes.
pub trait AccountRepository {
    fn find_tutor(&self, email: &Email) -> RepoResult<Option<Tutor>>;
    fn find_student(&self, email: &Email) -> RepoResult<Option<Student>>;
    /// Returns stored students among `emails`; unknown emails are skipped.
    fn find_students(&self, emails: &EmailSet) -> RepoResult<Vec<Student>>;
    /// Returns every student linked to `tutor`, suspended or not.
    fn list_students_of_tutor(&self, tutor: &Email) -> RepoResult<Vec<Student>>;
    fn find_or_create_tutor(&self, email: &Email) -> RepoResult<Tutor>;
    fn find_or_create_student(&self, email: &Email) -> RepoResult<Student>;
    fn find_link(&self, tutor: &Email, student: &Email) -> RepoResult<Option<TutorStudent>>;
    /// Links an existing tutor and student; re-linking is a no-op.
    fn link_student(&self, tutor: &Email, student: &Email, active: Option<bool>)
        -> RepoResult<()>;
    /// Sets the suspension flag, returning `NotFound` for unknown students.
    fn set_student_suspended(&self, email: &Email, suspended: bool) -> RepoResult<()>;
}

impl AccountRepository for SqliteTutoringStore<'_> {
    fn find_tutor(&self, email: &Email) -> RepoResult<Option<Tutor>> {
        self.conn
            .query_row(
                "SELECT email, created_at FROM tutors WHERE email = ?1;",
                [email.as_str()],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()?
            .map(|(email, created_at)| -> RepoResult<Tutor> {
                Ok(Tutor {
                    email: parse_email("tutors", email)?,
                    created_at,
                })
            })
            .transpose()
    }

    fn find_student(&self, email: &Email) -> RepoResult<Option<Student>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{STUDENT_SELECT_SQL} WHERE s.email = ?1;"))?;
        let mut rows = stmt.query([email.as_str()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_student_row(row)?));
        }
        Ok(None)
    }

    fn find_students(&self, emails: &EmailSet) -> RepoResult<Vec<Student>> {
        let candidates: Vec<&Email> = emails.iter().collect();
        let mut students = Vec::new();

        for chunk in candidates.chunks(EMAIL_LOOKUP_CHUNK) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let mut stmt = self.conn.prepare(&format!(
                "{STUDENT_SELECT_SQL} WHERE s.email IN ({placeholders}) ORDER BY s.email ASC;"
            ))?;
            let binds = chunk
                .iter()
                .map(|email| Value::Text(email.as_str().to_string()));
            let mut rows = stmt.query(params_from_iter(binds))?;
            while let Some(row) = rows.next()? {
                students.push(parse_student_row(row)?);
            }
        }

        Ok(students)
    }

    fn list_students_of_tutor(&self, tutor: &Email) -> RepoResult<Vec<Student>> {
        let mut stmt = self.conn.prepare(&format!(
            "{STUDENT_SELECT_SQL}
             INNER JOIN tutor_students ts ON ts.student = s.email
             WHERE ts.tutor = ?1
             ORDER BY s.email ASC;"
        ))?;
        let mut rows = stmt.query([tutor.as_str()])?;
        let mut students = Vec::new();
        while let Some(row) = rows.next()? {
            students.push(parse_student_row(row)?);
        }
        Ok(students)
    }

    fn find_link(&self, tutor: &Email, student: &Email) -> RepoResult<Option<TutorStudent>> {
        let active = self
            .conn
            .query_row(
                "SELECT active FROM tutor_students WHERE tutor = ?1 AND student = ?2;",
                params![tutor.as_str(), student.as_str()],
                |row| row.get::<_, Option<i64>>(0),
            )
            .optional()?;

        match active {
            None => Ok(None),
            Some(active) => Ok(Some(TutorStudent {
                tutor: tutor.clone(),
                student: student.clone(),
                active: active
                    .map(|value| int_to_bool("tutor_students", "active", value))
                    .transpose()?,
            })),
        }
    }

    fn find_or_create_tutor(&self, email: &Email) -> RepoResult<Tutor> {
        self.retry.run("find_or_create_tutor", || {
            self.conn.execute(
                "INSERT INTO tutors (email) VALUES (?1) ON CONFLICT (email) DO NOTHING;",
                [email.as_str()],
            )?;
            Ok::<_, RepoError>(())
        })?;

        self.find_tutor(email)?
            .ok_or_else(|| RepoError::not_found("tutor", email.as_str()))
    }

    fn find_or_create_student(&self, email: &Email) -> RepoResult<Student> {
        self.retry.run("find_or_create_student", || {
            self.conn.execute(
                "INSERT INTO students (email) VALUES (?1) ON CONFLICT (email) DO NOTHING;",
                [email.as_str()],
            )?;
            Ok::<_, RepoError>(())
        })?;

        self.find_student(email)?
            .ok_or_else(|| RepoError::not_found("student", email.as_str()))
    }

    fn link_student(
        &self,
        tutor: &Email,
        student: &Email,
        active: Option<bool>,
    ) -> RepoResult<()> {
        self.retry.run("link_student", || {
            self.conn.execute(
                "INSERT INTO tutor_students (tutor, student, active)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT (tutor, student) DO NOTHING;",
                params![tutor.as_str(), student.as_str(), active.map(bool_to_int)],
            )?;
            Ok(())
        })
    }

    fn set_student_suspended(&self, email: &Email, suspended: bool) -> RepoResult<()> {
        let changed = self.retry.run("set_student_suspended", || {
            Ok::<_, RepoError>(self.conn.execute(
                "UPDATE students
                 SET
                    suspended = ?2,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE email = ?1;",
                params![email.as_str(), bool_to_int(suspended)],
            )?)
        })?;

        if changed == 0 {
            return Err(RepoError::not_found("student", email.as_str()));
        }
        Ok(())
    }
}

fn parse_student_row(row: &Row<'_>) -> RepoResult<Student> {
    let email: String = row.get("email")?;
    Ok(Student {
        email: parse_email("students", email)?,
        suspended: int_to_bool("students", "suspended", row.get("suspended")?)?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_email(table: &str, value: String) -> RepoResult<Email> {
    Email::parse(value).map_err(|err| {
        RepoError::InvalidData(format!("invalid email `{}` in {table}.email", err.value))
    })
}
