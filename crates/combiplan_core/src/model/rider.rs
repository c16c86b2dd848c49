//! Rider identity and directory profile.
//!
//! # Responsibility
//! - Normalize and validate the stable rider identity (verified e-mail).
//! - Define the directory record carrying push target and admin flag.
//!
//! # Invariants
//! - A `RiderId` is always trimmed and lowercased.
//! - The directory holds at most one push target per rider.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

/// Identity construction errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RiderIdError {
    Empty,
    InvalidEmail(String),
}

impl Display for RiderIdError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "rider identity cannot be empty"),
            Self::InvalidEmail(value) => write!(f, "rider identity is not an e-mail: `{value}`"),
        }
    }
}

impl Error for RiderIdError {}

/// Stable rider identity used to key schedules and directory entries.
///
/// The auth collaborator supplies a verified e-mail; this type only
/// normalizes it (trim + lowercase) so two spellings of one address can
/// never produce two documents.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RiderId(String);

impl RiderId {
    /// Normalizes and validates a raw identity string.
    pub fn new(raw: &str) -> Result<Self, RiderIdError> {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(RiderIdError::Empty);
        }
        if !EMAIL_RE.is_match(&normalized) {
            return Err(RiderIdError::InvalidEmail(normalized));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RiderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Directory record for one rider.
///
/// Mirrors the external `users` document: display name, registered push
/// target and admin flag. Written only by the owning rider's session
/// (last write wins); read by the notification fan-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiderProfile {
    #[serde(rename = "email")]
    pub rider: RiderId,
    /// Display name shown in rosters and notification bodies.
    #[serde(rename = "name", default)]
    pub display_name: String,
    /// Registered push target, absent until the rider opts in.
    #[serde(rename = "fcmToken", default, skip_serializing_if = "Option::is_none")]
    pub push_token: Option<String>,
    /// Grants access to the broadcast path.
    #[serde(rename = "isAdmin", default)]
    pub is_admin: bool,
}

impl RiderProfile {
    /// Creates a profile with no push target and no admin rights.
    pub fn new(rider: RiderId, display_name: impl Into<String>) -> Self {
        Self {
            rider,
            display_name: display_name.into(),
            push_token: None,
            is_admin: false,
        }
    }
}
