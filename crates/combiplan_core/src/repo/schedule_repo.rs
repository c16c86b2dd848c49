//! Schedule document repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Load and replace per-rider schedule documents.
//! - Shield aggregation from per-row document corruption.
//!
//! # Invariants
//! - `save` replaces the whole document; there is no partial merge, so
//!   concurrent saves from one rider resolve to the last writer.
//! - A corrupt `days_doc` loads as an empty day map with a logged warning
//!   (scalar column corruption still surfaces as `InvalidData`).

use crate::model::rider::RiderId;
use crate::model::schedule::{DayPlan, RiderSchedule};
use crate::repo::{RepoError, RepoResult};
use crate::week::Weekday;
use log::warn;
use rusqlite::{params, Connection, Row};
use std::collections::BTreeMap;

const SCHEDULE_SELECT_SQL: &str = "SELECT
    rider_email,
    display_name,
    days_doc,
    updated_at
FROM schedules";

/// Repository interface for schedule documents.
pub trait ScheduleRepository {
    /// Loads one rider's document. Absent document is `None`, not an error.
    fn load(&self, rider: &RiderId) -> RepoResult<Option<RiderSchedule>>;
    /// Loads every stored document, ordered by rider identity.
    fn list_all(&self) -> RepoResult<Vec<RiderSchedule>>;
    /// Replaces one rider's document wholesale.
    fn save(&self, schedule: &RiderSchedule) -> RepoResult<()>;
}

/// SQLite-backed schedule repository.
pub struct SqliteScheduleRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteScheduleRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ScheduleRepository for SqliteScheduleRepository<'_> {
    fn load(&self, rider: &RiderId) -> RepoResult<Option<RiderSchedule>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SCHEDULE_SELECT_SQL} WHERE rider_email = ?1;"))?;

        let mut rows = stmt.query(params![rider.as_str()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_schedule_row(row)?));
        }

        Ok(None)
    }

    fn list_all(&self) -> RepoResult<Vec<RiderSchedule>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SCHEDULE_SELECT_SQL} ORDER BY rider_email ASC;"))?;

        let mut rows = stmt.query([])?;
        let mut schedules = Vec::new();
        while let Some(row) = rows.next()? {
            schedules.push(parse_schedule_row(row)?);
        }

        Ok(schedules)
    }

    fn save(&self, schedule: &RiderSchedule) -> RepoResult<()> {
        let days_doc = serde_json::to_string(&schedule.days).map_err(|err| {
            RepoError::InvalidData(format!(
                "schedule for `{}` cannot be serialized: {err}",
                schedule.rider
            ))
        })?;

        self.conn.execute(
            "INSERT INTO schedules (rider_email, display_name, days_doc, updated_at)
             VALUES (?1, ?2, ?3, (strftime('%s', 'now') * 1000))
             ON CONFLICT(rider_email) DO UPDATE SET
                display_name = excluded.display_name,
                days_doc = excluded.days_doc,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![
                schedule.rider.as_str(),
                schedule.display_name.as_str(),
                days_doc,
            ],
        )?;

        Ok(())
    }
}

fn parse_schedule_row(row: &Row<'_>) -> RepoResult<RiderSchedule> {
    let email: String = row.get("rider_email")?;
    let rider = RiderId::new(&email).map_err(|err| {
        RepoError::InvalidData(format!(
            "invalid rider identity `{email}` in schedules.rider_email: {err}"
        ))
    })?;

    let days_doc: String = row.get("days_doc")?;
    let days: BTreeMap<Weekday, DayPlan> = match serde_json::from_str(&days_doc) {
        Ok(days) => days,
        Err(err) => {
            // Fail open: one rider's corrupt document must not take down
            // the whole roster. The rider aggregates as unanswered.
            warn!(
                "event=schedule_load module=repo status=warn rider={rider} error_code=days_doc_parse_failed error={err}"
            );
            BTreeMap::new()
        }
    };

    Ok(RiderSchedule {
        rider,
        display_name: row.get("display_name")?,
        days,
        updated_at_ms: row.get("updated_at")?,
    })
}
