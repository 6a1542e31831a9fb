use chrono::{TimeZone, Utc};
use rusqlite::Connection;
use tutorhub_core::db::open_db_in_memory;
use tutorhub_core::{
    Email, EmailSet, NotificationListQuery, NotificationService, NotificationServiceError,
    RosterService, SqliteTutoringStore,
};

fn email(value: &str) -> Email {
    Email::parse(value).unwrap()
}

fn emails(values: &[&str]) -> Vec<Email> {
    values.iter().map(|value| email(value)).collect()
}

fn set(values: &[&str]) -> EmailSet {
    values.iter().map(|value| email(value)).collect()
}

fn notification_rows(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM student_notifications;", [], |row| {
        row.get(0)
    })
    .unwrap()
}

/// a@a.com teaches s1 and suspended s2; s3 exists under another tutor.
fn seed(conn: &Connection) {
    let roster = RosterService::new(SqliteTutoringStore::try_new(conn).unwrap());
    roster
        .register_students(&email("a@a.com"), &emails(&["s1@x.com", "s2@x.com"]))
        .unwrap();
    roster
        .register_students(&email("b@b.com"), &emails(&["s3@x.com"]))
        .unwrap();
    roster.suspend_student(&email("s2@x.com")).unwrap();
}

#[test]
fn recipients_are_direct_and_mentioned_unsuspended_students() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let service = NotificationService::new(SqliteTutoringStore::try_new(&conn).unwrap());

    let receipt = service
        .post_notification(&email("a@a.com"), "Hello s3@x.com and s2@x.com")
        .unwrap();

    assert_eq!(receipt.message, "Notification posted");
    assert_eq!(receipt.recipients, emails(&["s1@x.com", "s3@x.com"]));
    assert_eq!(notification_rows(&conn), 2);
}

#[test]
fn plan_splits_direct_and_mentioned_recipients() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let service = NotificationService::new(SqliteTutoringStore::try_new(&conn).unwrap());

    let plan = service
        .plan_recipients(&email("a@a.com"), "see s3@x.com, s1@x.com and nobody@x.com")
        .unwrap();

    assert_eq!(plan.direct, set(&["s1@x.com"]));
    assert_eq!(plan.mentioned, set(&["s1@x.com", "s3@x.com"]));
    assert_eq!(plan.recipients(), set(&["s1@x.com", "s3@x.com"]));
    assert_eq!(notification_rows(&conn), 0);
}

#[test]
fn registered_and_mentioned_student_is_notified_once() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let service = NotificationService::new(SqliteTutoringStore::try_new(&conn).unwrap());

    let receipt = service
        .post_notification(&email("a@a.com"), "Reminder for s1@x.com")
        .unwrap();

    assert_eq!(receipt.recipients, emails(&["s1@x.com"]));
    assert_eq!(notification_rows(&conn), 1);
}

#[test]
fn unknown_tutor_is_not_found_and_writes_nothing() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let service = NotificationService::new(SqliteTutoringStore::try_new(&conn).unwrap());

    let err = service
        .post_notification(&email("ghost@x.com"), "hello s1@x.com")
        .unwrap_err();

    assert!(matches!(err, NotificationServiceError::AccountNotFound(_)));
    assert_eq!(notification_rows(&conn), 0);
}

#[test]
fn zero_recipients_is_a_successful_post() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let service = NotificationService::new(SqliteTutoringStore::try_new(&conn).unwrap());
    RosterService::new(SqliteTutoringStore::try_new(&conn).unwrap())
        .suspend_student(&email("s1@x.com"))
        .unwrap();

    let receipt = service
        .post_notification(&email("a@a.com"), "nobody is listening")
        .unwrap();

    assert!(receipt.recipients.is_empty());
    assert_eq!(notification_rows(&conn), 0);
}

#[test]
fn failed_insert_rolls_back_the_whole_fan_out() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    conn.execute_batch(
        "CREATE TRIGGER reject_s3 BEFORE INSERT ON student_notifications
         WHEN NEW.student = 's3@x.com'
         BEGIN
            SELECT RAISE(ABORT, 'rejected');
         END;",
    )
    .unwrap();
    let service = NotificationService::new(SqliteTutoringStore::try_new(&conn).unwrap());

    let err = service
        .post_notification(&email("a@a.com"), "ping s3@x.com")
        .unwrap_err();

    assert!(matches!(err, NotificationServiceError::Repo(_)));
    assert_eq!(notification_rows(&conn), 0);
}

#[test]
fn stored_rows_carry_title_message_and_clock() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let service = NotificationService::new(SqliteTutoringStore::try_new(&conn).unwrap());
    let generated_at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();

    service
        .post_notification_at(&email("a@a.com"), "Exam on Friday s3@x.com", generated_at)
        .unwrap();

    let rows = service
        .list_notifications(&NotificationListQuery {
            student: Some(email("s3@x.com")),
            ..NotificationListQuery::default()
        })
        .unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.tutor, email("a@a.com"));
    assert_eq!(row.title, "[Tutor a]: 2024-01-02T03:04:05Z");
    assert_eq!(row.message, "Exam on Friday s3@x.com");
    assert_eq!(row.created_at, generated_at.timestamp_millis());
}

#[test]
fn listing_filters_by_tutor_and_orders_newest_first() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let service = NotificationService::new(SqliteTutoringStore::try_new(&conn).unwrap());
    let earlier = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let later = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();

    service
        .post_notification_at(&email("a@a.com"), "first", earlier)
        .unwrap();
    service
        .post_notification_at(&email("a@a.com"), "second", later)
        .unwrap();
    service
        .post_notification_at(&email("b@b.com"), "from b", later)
        .unwrap();

    let from_a = service
        .list_notifications(&NotificationListQuery {
            tutor: Some(email("a@a.com")),
            ..NotificationListQuery::default()
        })
        .unwrap();
    let messages: Vec<&str> = from_a.iter().map(|row| row.message.as_str()).collect();
    assert_eq!(messages, vec!["second", "first"]);

    let limited = service
        .list_notifications(&NotificationListQuery {
            limit: Some(1),
            ..NotificationListQuery::default()
        })
        .unwrap();
    assert_eq!(limited.len(), 1);
}
