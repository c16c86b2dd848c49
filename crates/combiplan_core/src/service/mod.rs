//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository and transport calls into use-case level APIs.
//! - Keep host/trigger layers decoupled from storage details.

pub mod notify_service;
pub mod roster_service;
pub mod schedule_service;
