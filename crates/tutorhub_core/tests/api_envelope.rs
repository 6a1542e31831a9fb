use serde_json::json;
use tutorhub_core::db::open_db_in_memory;
use tutorhub_core::{
    CommonStudentsRequest, ListNotificationsRequest, RegisterRequest,
    RetrieveNotificationsRequest, RetryPolicy, SuspendRequest, TutoringApi,
};

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

fn register_request(tutor: &str, students: &[&str]) -> RegisterRequest {
    RegisterRequest {
        tutor: Some(tutor.to_string()),
        students: Some(strings(students)),
    }
}

#[test]
fn register_then_query_round_trip() {
    let conn = open_db_in_memory().unwrap();
    let api = TutoringApi::try_new(&conn, RetryPolicy::default()).unwrap();

    let registered = api.register(&register_request(
        "teacherken@gmail.com",
        &["studentjon@gmail.com", "studenthon@gmail.com"],
    ));
    assert_eq!(
        serde_json::to_value(&registered).unwrap(),
        json!({ "code": 200, "message": "Students Registered" })
    );

    let common = api.common_students(&CommonStudentsRequest {
        tutor: strings(&["teacherken@gmail.com"]),
    });
    assert_eq!(
        serde_json::to_value(&common).unwrap(),
        json!({
            "code": 200,
            "message": "Common students retrieved",
            "students": ["studenthon@gmail.com", "studentjon@gmail.com"]
        })
    );
}

#[test]
fn register_validation_reports_first_failing_field() {
    let conn = open_db_in_memory().unwrap();
    let api = TutoringApi::try_new(&conn, RetryPolicy::default()).unwrap();

    let missing_tutor = api.register(&RegisterRequest {
        tutor: None,
        students: Some(strings(&["s1@x.com"])),
    });
    assert_eq!(
        serde_json::to_value(&missing_tutor).unwrap(),
        json!({
            "code": 400,
            "message": "Validation Failed",
            "details": [{ "tutor": "\"tutor\" is required" }]
        })
    );

    let bad_student = api.register(&register_request("a@a.com", &["s1@x.com", "nope"]));
    assert_eq!(bad_student.code, 400);
    assert_eq!(
        bad_student.details[0].get("students").map(String::as_str),
        Some("\"students[1]\" must be a valid email")
    );

    let no_students = api.register(&RegisterRequest {
        tutor: Some("a@a.com".to_string()),
        students: Some(Vec::new()),
    });
    assert_eq!(
        no_students.details[0].get("students").map(String::as_str),
        Some("\"students\" is required")
    );
}

#[test]
fn common_students_with_invalid_tutor_is_empty_success() {
    let conn = open_db_in_memory().unwrap();
    let api = TutoringApi::try_new(&conn, RetryPolicy::default()).unwrap();
    api.register(&register_request("a@a.com", &["s1@x.com"]));

    let response = api.common_students(&CommonStudentsRequest {
        tutor: strings(&["a@a.com", "not-an-email"]),
    });
    assert_eq!(response.code, 200);
    assert!(response.data.students.is_empty());

    let empty = api.common_students(&CommonStudentsRequest::default());
    assert_eq!(empty.code, 200);
    assert!(empty.data.students.is_empty());
}

#[test]
fn suspend_reports_local_part_or_not_found() {
    let conn = open_db_in_memory().unwrap();
    let api = TutoringApi::try_new(&conn, RetryPolicy::default()).unwrap();
    api.register(&register_request("a@a.com", &["noah@noah.com"]));

    let suspended = api.suspend(&SuspendRequest {
        student: Some("noah@noah.com".to_string()),
    });
    assert_eq!(
        serde_json::to_value(&suspended).unwrap(),
        json!({ "code": 200, "message": "noah has been suspended" })
    );

    let unknown = api.suspend(&SuspendRequest {
        student: Some("ghost@x.com".to_string()),
    });
    assert_eq!(unknown.code, 400);
    assert_eq!(unknown.message, "An account could not be found");

    let invalid = api.suspend(&SuspendRequest {
        student: Some("ghost".to_string()),
    });
    assert_eq!(invalid.message, "Validation Failed");
}

#[test]
fn retrieve_notifications_lists_recipients() {
    let conn = open_db_in_memory().unwrap();
    let api = TutoringApi::try_new(&conn, RetryPolicy::default()).unwrap();
    api.register(&register_request("a@a.com", &["s1@x.com", "s2@x.com"]));
    api.register(&register_request("b@b.com", &["s3@x.com"]));
    api.suspend(&SuspendRequest {
        student: Some("s2@x.com".to_string()),
    });

    let response = api.retrieve_notifications(&RetrieveNotificationsRequest {
        tutor: Some("a@a.com".to_string()),
        notification: Some("Hello s3@x.com s2@x.com".to_string()),
    });
    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        json!({
            "code": 200,
            "message": "Notification posted",
            "tutor": "a@a.com",
            "recipients": ["s1@x.com", "s3@x.com"]
        })
    );

    let listed = api.list_notifications(&ListNotificationsRequest {
        student: Some("s3@x.com".to_string()),
        ..ListNotificationsRequest::default()
    });
    assert_eq!(listed.code, 200);
    assert_eq!(listed.data.notifications.len(), 1);
    assert_eq!(listed.data.notifications[0].message, "Hello s3@x.com s2@x.com");
}

#[test]
fn retrieve_notifications_failures() {
    let conn = open_db_in_memory().unwrap();
    let api = TutoringApi::try_new(&conn, RetryPolicy::default()).unwrap();

    let blank = api.retrieve_notifications(&RetrieveNotificationsRequest {
        tutor: Some("a@a.com".to_string()),
        notification: Some("   ".to_string()),
    });
    assert_eq!(blank.code, 400);
    assert_eq!(
        blank.details[0].get("notification").map(String::as_str),
        Some("\"notification\" is required")
    );

    let unknown = api.retrieve_notifications(&RetrieveNotificationsRequest {
        tutor: Some("ghost@x.com".to_string()),
        notification: Some("hello".to_string()),
    });
    assert_eq!(unknown.code, 400);
    assert_eq!(unknown.message, "An account could not be found");
    assert!(unknown.data.recipients.is_empty());
}

#[test]
fn store_failure_during_fan_out_is_internal_error() {
    let conn = open_db_in_memory().unwrap();
    let api = TutoringApi::try_new(&conn, RetryPolicy::default()).unwrap();
    api.register(&register_request("a@a.com", &["s1@x.com", "s3@x.com"]));
    conn.execute_batch(
        "CREATE TRIGGER reject_s3 BEFORE INSERT ON student_notifications
         WHEN NEW.student = 's3@x.com'
         BEGIN
            SELECT RAISE(ABORT, 'rejected');
         END;",
    )
    .unwrap();

    let response = api.retrieve_notifications(&RetrieveNotificationsRequest {
        tutor: Some("a@a.com".to_string()),
        notification: Some("hello class".to_string()),
    });

    assert_eq!(response.code, 500);
    assert!(!response.is_success());
    assert!(response.message.contains("rejected"), "{}", response.message);
    assert_eq!(response.data.tutor, "a@a.com");
    assert!(response.data.recipients.is_empty());

    let stored: i64 = conn
        .query_row("SELECT COUNT(*) FROM student_notifications;", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(stored, 0);
}

#[test]
fn list_notifications_rejects_malformed_filters() {
    let conn = open_db_in_memory().unwrap();
    let api = TutoringApi::try_new(&conn, RetryPolicy::default()).unwrap();

    let response = api.list_notifications(&ListNotificationsRequest {
        tutor: Some("not-an-email".to_string()),
        ..ListNotificationsRequest::default()
    });
    assert_eq!(response.code, 400);
    assert!(response.data.notifications.is_empty());
}

#[test]
fn api_rejects_unmigrated_connection() {
    let conn = rusqlite::Connection::open_in_memory().unwrap();
    assert!(TutoringApi::try_new(&conn, RetryPolicy::no_retry()).is_err());
}

#[test]
fn requests_deserialize_from_json_bodies() {
    let register: RegisterRequest = serde_json::from_value(json!({
        "tutor": "a@a.com",
        "students": ["s1@x.com"]
    }))
    .unwrap();
    assert_eq!(register, register_request("a@a.com", &["s1@x.com"]));

    let common: CommonStudentsRequest = serde_json::from_value(json!({})).unwrap();
    assert!(common.tutor.is_empty());
}
