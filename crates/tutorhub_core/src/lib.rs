//! Core domain logic for TutorHub.
//! This crate is the single source of truth for roster and notification rules.

pub mod api;
pub mod config;
pub mod db;
pub mod logging;
pub mod mention;
pub mod model;
pub mod repo;
pub mod service;

pub use api::{
    ApiResponse, CommonStudentsRequest, ListNotificationsRequest, RegisterRequest,
    RetrieveNotificationsRequest, SuspendRequest, TutoringApi,
};
pub use config::{ConfigError, CoreConfig};
pub use db::{open_db, open_db_in_memory, DbError, RetryPolicy};
pub use logging::{default_log_level, init_logging, logging_status};
pub use mention::extract_mentions;
pub use model::account::{Student, Tutor, TutorStudent};
pub use model::email::{Email, EmailError, EmailSet};
pub use model::notification::StudentNotification;
pub use repo::account_repo::AccountRepository;
pub use repo::notification_repo::{NotificationListQuery, NotificationRepository};
pub use repo::store::{RepoError, RepoResult, SqliteTutoringStore, UnitOfWork};
pub use service::notification_service::{
    NotificationReceipt, NotificationService, NotificationServiceError, RecipientPlan,
};
pub use service::roster_service::{Registration, RosterService, RosterServiceError, Suspension};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
