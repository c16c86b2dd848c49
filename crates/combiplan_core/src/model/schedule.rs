//! Trip schedule document model.
//!
//! # Responsibility
//! - Define the per-rider, per-weekday, per-leg trip declaration record.
//! - Provide the staleness rule deciding whether a stored entry applies
//!   to a concrete target date.
//!
//! # Invariants
//! - An entry applies to date D iff it is recurring, or its confirmed
//!   date equals D exactly. Anything else counts as unanswered for D.
//! - Serialized field names are the external document schema (`usar`,
//!   `parada`, `recurrente`, `fecha`, `dias`, `nombre`).

use crate::model::rider::RiderId;
use crate::week::{DayWindow, Weekday};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Serde adapter for `fecha` fields stored as `DD/MM/YYYY` strings.
mod fecha_format {
    use crate::week::DATE_FORMAT;
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(date) => serializer.serialize_str(&date.format(DATE_FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(text) => NaiveDate::parse_from_str(&text, DATE_FORMAT)
                .map(Some)
                .map_err(|err| serde::de::Error::custom(format!("invalid fecha `{text}`: {err}"))),
            None => Ok(None),
        }
    }
}

/// Travel leg of a business day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Leg {
    /// Morning outbound trip.
    Ida,
    /// Afternoon return trip.
    Vuelta,
}

impl Leg {
    pub fn label(self) -> &'static str {
        match self {
            Leg::Ida => "ida",
            Leg::Vuelta => "vuelta",
        }
    }

    /// Returns the opposite leg of the same day.
    pub fn other(self) -> Leg {
        match self {
            Leg::Ida => Leg::Vuelta,
            Leg::Vuelta => Leg::Ida,
        }
    }
}

impl Display for Leg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One rider's declaration for one weekday and one leg.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegEntry {
    /// `Some(true)` = traveling, `Some(false)` = explicitly not traveling,
    /// `None` = unanswered.
    #[serde(rename = "usar", default, skip_serializing_if = "Option::is_none")]
    pub riding: Option<bool>,
    /// Boarding stop; required in practice whenever `riding` is true.
    #[serde(rename = "parada", default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<String>,
    /// A recurring entry applies to every future occurrence of its weekday.
    #[serde(rename = "recurrente", default)]
    pub recurring: bool,
    /// The concrete date this entry was last confirmed for. Only consulted
    /// when `recurring` is false.
    #[serde(
        rename = "fecha",
        default,
        with = "fecha_format",
        skip_serializing_if = "Option::is_none"
    )]
    pub confirmed_date: Option<NaiveDate>,
}

impl LegEntry {
    /// Whether this stored entry still counts for `date`.
    ///
    /// A non-recurring entry confirmed for a different date models
    /// "I said yes last week, not this week" and does not apply.
    pub fn applies_on(&self, date: NaiveDate) -> bool {
        if self.recurring {
            return true;
        }
        self.confirmed_date == Some(date)
    }

    /// Returns the definite answer for `date`, when one exists.
    ///
    /// Stale or unanswered entries yield `None`.
    pub fn answered_for(&self, date: NaiveDate) -> Option<bool> {
        if self.applies_on(date) {
            self.riding
        } else {
            None
        }
    }
}

/// Both legs of one weekday.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayPlan {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ida: Option<LegEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vuelta: Option<LegEntry>,
}

impl DayPlan {
    pub fn leg(&self, leg: Leg) -> Option<&LegEntry> {
        match leg {
            Leg::Ida => self.ida.as_ref(),
            Leg::Vuelta => self.vuelta.as_ref(),
        }
    }

    fn leg_mut(&mut self, leg: Leg) -> Option<&mut LegEntry> {
        match leg {
            Leg::Ida => self.ida.as_mut(),
            Leg::Vuelta => self.vuelta.as_mut(),
        }
    }
}

/// Schedule validation failures, rejected before any side effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleValidationError {
    /// An entry declares travel but names no boarding stop.
    MissingStop { day: Weekday, leg: Leg },
}

impl Display for ScheduleValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingStop { day, leg } => {
                write!(f, "entry for {day} {leg} declares travel but has no stop")
            }
        }
    }
}

impl Error for ScheduleValidationError {}

/// One rider's full weekly schedule document.
///
/// Owned exclusively by the rider; every save replaces the whole `days`
/// mapping (last writer wins, no partial merge across devices).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiderSchedule {
    #[serde(rename = "email")]
    pub rider: RiderId,
    #[serde(rename = "nombre", default)]
    pub display_name: String,
    #[serde(rename = "dias", default)]
    pub days: BTreeMap<Weekday, DayPlan>,
    /// Epoch milliseconds of the last accepted save.
    #[serde(rename = "updated", default, skip_serializing_if = "Option::is_none")]
    pub updated_at_ms: Option<i64>,
}

impl RiderSchedule {
    /// Creates a schedule with no declarations, the "no document yet" state.
    pub fn empty(rider: RiderId, display_name: impl Into<String>) -> Self {
        Self {
            rider,
            display_name: display_name.into(),
            days: BTreeMap::new(),
            updated_at_ms: None,
        }
    }

    /// Returns the stored entry for one weekday and leg, if any.
    pub fn entry(&self, day: Weekday, leg: Leg) -> Option<&LegEntry> {
        self.days.get(&day).and_then(|plan| plan.leg(leg))
    }

    /// Checks every entry against construction-time rules.
    ///
    /// # Errors
    /// - [`ScheduleValidationError::MissingStop`] when an entry declares
    ///   travel without naming a stop.
    pub fn validate(&self) -> Result<(), ScheduleValidationError> {
        for (day, plan) in &self.days {
            for leg in [Leg::Ida, Leg::Vuelta] {
                if let Some(entry) = plan.leg(leg) {
                    let stop_missing = entry
                        .stop
                        .as_deref()
                        .map_or(true, |stop| stop.trim().is_empty());
                    if entry.riding == Some(true) && stop_missing {
                        return Err(ScheduleValidationError::MissingStop { day: *day, leg });
                    }
                }
            }
        }
        Ok(())
    }

    /// Stamps every entry on a window day with that day's concrete date.
    ///
    /// Run on save so non-recurring answers expire once the weekday rolls
    /// over to a new calendar date.
    pub fn stamp_confirmed_dates(&mut self, window: &[DayWindow]) {
        for day in window {
            if let Some(plan) = self.days.get_mut(&day.weekday) {
                for leg in [Leg::Ida, Leg::Vuelta] {
                    if let Some(entry) = plan.leg_mut(leg) {
                        entry.confirmed_date = Some(day.date);
                    }
                }
            }
        }
    }
}
