//! Persistence contracts over the rider directory and schedule documents.
//!
//! # Responsibility
//! - Provide stable read/write APIs over `riders` and `schedules` storage.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Schedule writes are whole-document replacements (last writer wins).
//! - Write paths validate before SQL mutations; roster-facing read paths
//!   fail open to an empty document instead of aborting aggregation.

use crate::db::DbError;
use crate::model::schedule::ScheduleValidationError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod rider_repo;
pub mod schedule_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for directory and schedule persistence.
#[derive(Debug)]
pub enum RepoError {
    Validation(ScheduleValidationError),
    Db(DbError),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<ScheduleValidationError> for RepoError {
    fn from(value: ScheduleValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
