//! Domain model for riders and their trip schedules.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep one schedule-document shape shared by store, roster and notifier.
//!
//! # Invariants
//! - Rider identity is a normalized e-mail and never changes case.
//! - Schedule mutation is whole-document replacement, never a partial merge.

pub mod rider;
pub mod schedule;
