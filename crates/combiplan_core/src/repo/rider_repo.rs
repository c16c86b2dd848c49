//! Rider directory contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist rider profiles (display name, push target, admin flag).
//! - Support push-target registration and pruning of dead targets.
//!
//! # Invariants
//! - Profiles are keyed by normalized rider identity.
//! - Pruning removes a target by value wherever it is registered, so a
//!   dead target is never retried on a later fan-out.

use crate::model::rider::{RiderId, RiderProfile};
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

const RIDER_SELECT_SQL: &str = "SELECT
    email,
    name,
    push_token,
    is_admin
FROM riders";

/// Repository interface for the rider directory.
pub trait RiderDirectory {
    /// Creates or replaces one rider profile.
    fn upsert(&self, profile: &RiderProfile) -> RepoResult<()>;
    /// Returns one profile, or `None` when the rider has no directory entry.
    fn get(&self, rider: &RiderId) -> RepoResult<Option<RiderProfile>>;
    /// Returns every profile, ordered by rider identity.
    fn list(&self) -> RepoResult<Vec<RiderProfile>>;
    /// Registers or replaces the rider's push target, creating the
    /// directory entry when missing.
    fn register_push_token(&self, rider: &RiderId, token: &str) -> RepoResult<()>;
    /// Removes a push target by value from every profile carrying it.
    /// Returns the number of profiles changed.
    fn clear_push_token(&self, token: &str) -> RepoResult<usize>;
}

/// SQLite-backed rider directory.
pub struct SqliteRiderDirectory<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRiderDirectory<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl RiderDirectory for SqliteRiderDirectory<'_> {
    fn upsert(&self, profile: &RiderProfile) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO riders (email, name, push_token, is_admin, updated_at)
             VALUES (?1, ?2, ?3, ?4, (strftime('%s', 'now') * 1000))
             ON CONFLICT(email) DO UPDATE SET
                name = excluded.name,
                push_token = excluded.push_token,
                is_admin = excluded.is_admin,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![
                profile.rider.as_str(),
                profile.display_name.as_str(),
                profile.push_token.as_deref(),
                i64::from(profile.is_admin),
            ],
        )?;

        Ok(())
    }

    fn get(&self, rider: &RiderId) -> RepoResult<Option<RiderProfile>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{RIDER_SELECT_SQL} WHERE email = ?1;"))?;

        let mut rows = stmt.query(params![rider.as_str()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_rider_row(row)?));
        }

        Ok(None)
    }

    fn list(&self) -> RepoResult<Vec<RiderProfile>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{RIDER_SELECT_SQL} ORDER BY email ASC;"))?;

        let mut rows = stmt.query([])?;
        let mut profiles = Vec::new();
        while let Some(row) = rows.next()? {
            profiles.push(parse_rider_row(row)?);
        }

        Ok(profiles)
    }

    fn register_push_token(&self, rider: &RiderId, token: &str) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO riders (email, push_token, updated_at)
             VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
             ON CONFLICT(email) DO UPDATE SET
                push_token = excluded.push_token,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![rider.as_str(), token],
        )?;

        Ok(())
    }

    fn clear_push_token(&self, token: &str) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "UPDATE riders
             SET
                push_token = NULL,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE push_token = ?1;",
            params![token],
        )?;

        Ok(changed)
    }
}

fn parse_rider_row(row: &Row<'_>) -> RepoResult<RiderProfile> {
    let email: String = row.get("email")?;
    let rider = RiderId::new(&email).map_err(|err| {
        RepoError::InvalidData(format!(
            "invalid rider identity `{email}` in riders.email: {err}"
        ))
    })?;

    let is_admin = match row.get::<_, i64>("is_admin")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_admin value `{other}` in riders.is_admin"
            )));
        }
    };

    Ok(RiderProfile {
        rider,
        display_name: row.get("name")?,
        push_token: row.get("push_token")?,
        is_admin,
    })
}
