//! Business-day window resolution.
//!
//! # Responsibility
//! - Resolve the five upcoming business days used for schedule entry and
//!   roster display from a given wall-clock instant.
//! - Define the closed weekday vocabulary used to key rider schedules.
//!
//! # Invariants
//! - A resolved window always holds exactly [`WINDOW_DAYS`] entries,
//!   Monday through Friday only, in chronological order.
//! - Resolution is a pure function of the provided instant.

use chrono::{Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Local hour after which the current day is treated as operationally over
/// and entry shifts to the next business day.
pub const DAY_ROLLOVER_HOUR: u32 = 18;

/// Number of business days in a resolved window.
pub const WINDOW_DAYS: usize = 5;

/// Wire format for calendar dates (`fecha` fields and display dates).
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// Service wall-clock offset. The service runs in a single fixed UTC-3
/// region with no daylight saving.
pub const SERVICE_UTC_OFFSET_HOURS: i32 = -3;

/// Canonical weekday keys for rider schedules.
///
/// The serialized names are the exact document keys used by the schedule
/// store, accent included, so invalid keys cannot exist past construction.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Weekday {
    Lunes,
    Martes,
    #[serde(rename = "Miércoles")]
    Miercoles,
    Jueves,
    Viernes,
}

impl Weekday {
    /// All weekday keys in Monday-first order.
    pub const ALL: [Weekday; WINDOW_DAYS] = [
        Weekday::Lunes,
        Weekday::Martes,
        Weekday::Miercoles,
        Weekday::Jueves,
        Weekday::Viernes,
    ];

    /// Returns the canonical display label (same text as the wire key).
    pub fn label(self) -> &'static str {
        match self {
            Weekday::Lunes => "Lunes",
            Weekday::Martes => "Martes",
            Weekday::Miercoles => "Miércoles",
            Weekday::Jueves => "Jueves",
            Weekday::Viernes => "Viernes",
        }
    }

    /// Maps a calendar date onto the business-day vocabulary.
    ///
    /// Returns `None` for Saturday and Sunday.
    pub fn from_date(date: NaiveDate) -> Option<Weekday> {
        match date.weekday() {
            chrono::Weekday::Mon => Some(Weekday::Lunes),
            chrono::Weekday::Tue => Some(Weekday::Martes),
            chrono::Weekday::Wed => Some(Weekday::Miercoles),
            chrono::Weekday::Thu => Some(Weekday::Jueves),
            chrono::Weekday::Fri => Some(Weekday::Viernes),
            chrono::Weekday::Sat | chrono::Weekday::Sun => None,
        }
    }
}

impl std::fmt::Display for Weekday {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One resolved business day: the schedule key plus the concrete date that
/// key currently points at. Produced fresh on every resolution, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub weekday: Weekday,
    pub date: NaiveDate,
}

impl DayWindow {
    /// Returns the date in the `DD/MM/YYYY` wire format.
    pub fn formatted_date(&self) -> String {
        self.date.format(DATE_FORMAT).to_string()
    }
}

/// Returns the current service wall-clock time (fixed UTC-3).
pub fn service_now() -> NaiveDateTime {
    match FixedOffset::east_opt(SERVICE_UTC_OFFSET_HOURS * 3600) {
        Some(offset) => Utc::now().with_timezone(&offset).naive_local(),
        // Unreachable for the constant above; fall back to UTC rather than panic.
        None => Utc::now().naive_utc(),
    }
}

/// Resolves the five active business days for `now`.
///
/// - Saturday resolves to the week starting next Monday.
/// - Sunday resolves to the week starting next Monday.
/// - A weekday at or past [`DAY_ROLLOVER_HOUR`] starts tomorrow; when
///   tomorrow is Saturday the start advances to Monday.
/// - Any other weekday instant starts today.
pub fn resolve_week_window(now: NaiveDateTime) -> Vec<DayWindow> {
    let mut start = now.date();
    match start.weekday() {
        chrono::Weekday::Sat => start = start + Duration::days(2),
        chrono::Weekday::Sun => start = start + Duration::days(1),
        _ => {
            if now.hour() >= DAY_ROLLOVER_HOUR {
                start = start + Duration::days(1);
                if start.weekday() == chrono::Weekday::Sat {
                    start = start + Duration::days(2);
                }
            }
        }
    }

    let mut window = Vec::with_capacity(WINDOW_DAYS);
    let mut cursor = start;
    while window.len() < WINDOW_DAYS {
        if let Some(weekday) = Weekday::from_date(cursor) {
            window.push(DayWindow {
                weekday,
                date: cursor,
            });
        }
        cursor = cursor + Duration::days(1);
    }
    window
}

#[cfg(test)]
mod tests {
    use super::{resolve_week_window, DayWindow, Weekday, WINDOW_DAYS};
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(year, month, day)
            .expect("valid test date")
            .and_hms_opt(hour, minute, 0)
            .expect("valid test time")
    }

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid test date")
    }

    fn assert_window(window: &[DayWindow], expected_start: NaiveDate) {
        assert_eq!(window.len(), WINDOW_DAYS);
        assert_eq!(window[0].date, expected_start);
        for pair in window.windows(2) {
            assert!(pair[0].date < pair[1].date);
        }
        for day in window {
            assert_eq!(Weekday::from_date(day.date), Some(day.weekday));
        }
    }

    // 2026-08-07 is a Friday.
    #[test]
    fn friday_before_cutoff_starts_today() {
        let window = resolve_week_window(at(2026, 8, 7, 17, 59));
        assert_window(&window, date(2026, 8, 7));
        assert_eq!(window[0].weekday, Weekday::Viernes);
        assert_eq!(window[1].date, date(2026, 8, 10));
        assert_eq!(window[1].weekday, Weekday::Lunes);
    }

    #[test]
    fn friday_after_cutoff_starts_monday() {
        let window = resolve_week_window(at(2026, 8, 7, 18, 1));
        assert_window(&window, date(2026, 8, 10));
        assert_eq!(window[0].weekday, Weekday::Lunes);
    }

    #[test]
    fn saturday_starts_monday() {
        let window = resolve_week_window(at(2026, 8, 8, 10, 0));
        assert_window(&window, date(2026, 8, 10));
    }

    #[test]
    fn sunday_starts_monday() {
        let window = resolve_week_window(at(2026, 8, 9, 23, 0));
        assert_window(&window, date(2026, 8, 10));
    }

    #[test]
    fn midweek_after_cutoff_starts_tomorrow() {
        // Tuesday 2026-08-04 at 19:00 -> Wednesday.
        let window = resolve_week_window(at(2026, 8, 4, 19, 0));
        assert_window(&window, date(2026, 8, 5));
        assert_eq!(window[0].weekday, Weekday::Miercoles);
    }

    #[test]
    fn resolution_is_deterministic() {
        let now = at(2026, 8, 5, 9, 30);
        assert_eq!(resolve_week_window(now), resolve_week_window(now));
    }

    #[test]
    fn window_skips_weekend_in_the_middle() {
        // Wednesday start: Wed, Thu, Fri, Mon, Tue.
        let window = resolve_week_window(at(2026, 8, 5, 9, 0));
        let dates: Vec<_> = window.iter().map(|day| day.date).collect();
        assert_eq!(
            dates,
            vec![
                date(2026, 8, 5),
                date(2026, 8, 6),
                date(2026, 8, 7),
                date(2026, 8, 10),
                date(2026, 8, 11),
            ]
        );
    }

    #[test]
    fn formatted_date_uses_wire_format() {
        let day = DayWindow {
            weekday: Weekday::Lunes,
            date: date(2026, 8, 10),
        };
        assert_eq!(day.formatted_date(), "10/08/2026");
    }
}
