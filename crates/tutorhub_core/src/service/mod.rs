//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep the boundary layer decoupled from storage details.

pub mod notification_service;
pub mod roster_service;
pub mod student_status;
