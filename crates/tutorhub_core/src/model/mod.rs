//! Domain model for tutors, students and notifications.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//!
//! # Invariants
//! - Every account is identified by a validated `Email`.
//! - Notifications are append-only.

pub mod account;
pub mod email;
pub mod notification;
