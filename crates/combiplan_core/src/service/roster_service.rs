//! Per-day roster aggregation.
//!
//! # Responsibility
//! - Classify every rider into stop groups, not-traveling and unanswered
//!   buckets for one resolved day and leg.
//! - Derive return-status buckets for riders who traveled the morning leg.
//!
//! # Invariants
//! - Every rider in the input lands in exactly one of {stop group,
//!   not_traveling, unanswered} per leg.
//! - A rider joins `not_traveling` only when BOTH legs are a valid,
//!   definite "no" for the target date; partial information stays
//!   unanswered.
//! - Aggregation is pure and idempotent; insertion order within a stop
//!   group follows input order.

use crate::model::schedule::{Leg, RiderSchedule};
use crate::repo::schedule_repo::ScheduleRepository;
use crate::repo::RepoResult;
use crate::week::DayWindow;
use log::warn;
use std::collections::BTreeMap;

/// Derived, never-stored classification of all riders for one day/leg.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterBucket {
    /// Stop name -> rider names, in input order.
    pub by_stop: BTreeMap<String, Vec<String>>,
    /// Riders with a valid, definite "no" on both legs of this date.
    pub not_traveling: Vec<String>,
    /// Riders with no valid, definite answer for this leg.
    pub unanswered: Vec<String>,
    /// Populated for the vuelta leg only.
    pub return_status: Option<ReturnStatus>,
}

/// Return-leg status for riders who traveled the morning leg.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReturnStatus {
    /// Valid "yes" for the return leg.
    pub confirmed: Vec<String>,
    /// Valid, explicit "no": went out, will not come back on the combi.
    pub no_return: Vec<String>,
    /// Went out, no valid answer for the return leg yet.
    pub pending: Vec<String>,
}

/// Both legs of one resolved day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayRoster {
    pub day: DayWindow,
    pub ida: RosterBucket,
    pub vuelta: RosterBucket,
}

/// Classifies all riders for one resolved day and leg.
pub fn aggregate_roster(
    schedules: &[RiderSchedule],
    day: &DayWindow,
    leg: Leg,
) -> RosterBucket {
    let mut bucket = RosterBucket::default();
    let mut return_status = (leg == Leg::Vuelta).then(ReturnStatus::default);

    for schedule in schedules {
        let name = roster_name(schedule);
        let plan = schedule.days.get(&day.weekday);
        let entry = plan.and_then(|plan| plan.leg(leg));

        match entry.and_then(|entry| entry.answered_for(day.date)) {
            Some(true) => {
                let stop = entry
                    .and_then(|entry| entry.stop.as_deref())
                    .filter(|stop| !stop.trim().is_empty());
                match stop {
                    Some(stop) => bucket
                        .by_stop
                        .entry(stop.to_string())
                        .or_default()
                        .push(name.clone()),
                    None => {
                        // Travel declared with no stop is malformed; keep the
                        // rider visible instead of silently dropping them.
                        warn!(
                            "event=roster_malformed_entry module=roster status=warn rider={} day={} leg={}",
                            schedule.rider, day.weekday, leg
                        );
                        bucket.unanswered.push(name.clone());
                    }
                }
            }
            Some(false) => {
                let other_answer = plan
                    .and_then(|plan| plan.leg(leg.other()))
                    .and_then(|entry| entry.answered_for(day.date));
                if other_answer == Some(false) {
                    bucket.not_traveling.push(name.clone());
                } else {
                    bucket.unanswered.push(name.clone());
                }
            }
            None => bucket.unanswered.push(name.clone()),
        }

        if let Some(status) = return_status.as_mut() {
            let went_out = plan
                .and_then(|plan| plan.leg(Leg::Ida))
                .and_then(|entry| entry.answered_for(day.date))
                == Some(true);
            if went_out {
                let back = plan
                    .and_then(|plan| plan.leg(Leg::Vuelta))
                    .and_then(|entry| entry.answered_for(day.date));
                match back {
                    Some(true) => status.confirmed.push(name.clone()),
                    Some(false) => status.no_return.push(name.clone()),
                    None => status.pending.push(name.clone()),
                }
            }
        }
    }

    bucket.return_status = return_status;
    bucket
}

fn roster_name(schedule: &RiderSchedule) -> String {
    if schedule.display_name.trim().is_empty() {
        schedule.rider.as_str().to_string()
    } else {
        schedule.display_name.clone()
    }
}

/// Use-case facade producing a full day roster from stored schedules.
pub struct RosterService<R: ScheduleRepository> {
    repo: R,
}

impl<R: ScheduleRepository> RosterService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Builds both legs' rosters for one resolved day.
    pub fn day_roster(&self, day: &DayWindow) -> RepoResult<DayRoster> {
        let schedules = self.repo.list_all()?;
        Ok(DayRoster {
            day: *day,
            ida: aggregate_roster(&schedules, day, Leg::Ida),
            vuelta: aggregate_roster(&schedules, day, Leg::Vuelta),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{aggregate_roster, RosterBucket};
    use crate::model::rider::RiderId;
    use crate::model::schedule::{DayPlan, Leg, LegEntry, RiderSchedule};
    use crate::week::{DayWindow, Weekday};
    use chrono::NaiveDate;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid test date")
    }

    fn day() -> DayWindow {
        DayWindow {
            weekday: Weekday::Lunes,
            date: date(2026, 8, 10),
        }
    }

    fn rider(name: &str, plan: DayPlan) -> RiderSchedule {
        let id = RiderId::new(&format!("{}@example.com", name.to_lowercase()))
            .expect("valid test rider");
        let mut schedule = RiderSchedule::empty(id, name);
        schedule.days.insert(Weekday::Lunes, plan);
        schedule
    }

    fn yes(stop: &str) -> LegEntry {
        LegEntry {
            riding: Some(true),
            stop: Some(stop.to_string()),
            recurring: false,
            confirmed_date: Some(date(2026, 8, 10)),
        }
    }

    fn no() -> LegEntry {
        LegEntry {
            riding: Some(false),
            stop: None,
            recurring: false,
            confirmed_date: Some(date(2026, 8, 10)),
        }
    }

    fn bucket_members(bucket: &RosterBucket) -> usize {
        bucket.by_stop.values().map(Vec::len).sum::<usize>()
            + bucket.not_traveling.len()
            + bucket.unanswered.len()
    }

    #[test]
    fn valid_yes_groups_by_stop_in_input_order() {
        let schedules = vec![
            rider(
                "Ana",
                DayPlan {
                    ida: Some(yes("Congreso")),
                    vuelta: None,
                },
            ),
            rider(
                "Beto",
                DayPlan {
                    ida: Some(yes("Congreso")),
                    vuelta: None,
                },
            ),
        ];
        let bucket = aggregate_roster(&schedules, &day(), Leg::Ida);
        assert_eq!(
            bucket.by_stop.get("Congreso"),
            Some(&vec!["Ana".to_string(), "Beto".to_string()])
        );
    }

    #[test]
    fn stale_dated_entry_counts_as_unanswered() {
        let stale = LegEntry {
            confirmed_date: Some(date(2026, 8, 3)),
            ..yes("Congreso")
        };
        let schedules = vec![rider(
            "Ana",
            DayPlan {
                ida: Some(stale),
                vuelta: None,
            },
        )];
        let bucket = aggregate_roster(&schedules, &day(), Leg::Ida);
        assert!(bucket.by_stop.is_empty());
        assert_eq!(bucket.unanswered, vec!["Ana".to_string()]);
    }

    #[test]
    fn recurring_entry_ignores_its_stored_date() {
        let recurring = LegEntry {
            recurring: true,
            confirmed_date: Some(date(2026, 6, 1)),
            ..yes("Vedia")
        };
        let schedules = vec![rider(
            "Ana",
            DayPlan {
                ida: Some(recurring),
                vuelta: None,
            },
        )];
        let bucket = aggregate_roster(&schedules, &day(), Leg::Ida);
        assert_eq!(
            bucket.by_stop.get("Vedia"),
            Some(&vec!["Ana".to_string()])
        );
    }

    #[test]
    fn not_traveling_requires_a_definite_no_on_both_legs() {
        let both_no = rider(
            "Ana",
            DayPlan {
                ida: Some(no()),
                vuelta: Some(no()),
            },
        );
        let ida_no_only = rider(
            "Beto",
            DayPlan {
                ida: Some(no()),
                vuelta: None,
            },
        );
        let schedules = vec![both_no, ida_no_only];

        let bucket = aggregate_roster(&schedules, &day(), Leg::Ida);
        assert_eq!(bucket.not_traveling, vec!["Ana".to_string()]);
        assert_eq!(bucket.unanswered, vec!["Beto".to_string()]);
    }

    #[test]
    fn travel_without_stop_is_flagged_as_unanswered_not_dropped() {
        let malformed = LegEntry {
            stop: None,
            ..yes("ignored")
        };
        let schedules = vec![rider(
            "Ana",
            DayPlan {
                ida: Some(malformed),
                vuelta: None,
            },
        )];
        let bucket = aggregate_roster(&schedules, &day(), Leg::Ida);
        assert!(bucket.by_stop.is_empty());
        assert_eq!(bucket.unanswered, vec!["Ana".to_string()]);
    }

    #[test]
    fn every_rider_lands_in_exactly_one_bucket_per_leg() {
        let schedules = vec![
            rider(
                "Ana",
                DayPlan {
                    ida: Some(yes("Congreso")),
                    vuelta: Some(yes("Retiro")),
                },
            ),
            rider(
                "Beto",
                DayPlan {
                    ida: Some(no()),
                    vuelta: Some(no()),
                },
            ),
            rider(
                "Carla",
                DayPlan {
                    ida: None,
                    vuelta: None,
                },
            ),
            rider(
                "Dario",
                DayPlan {
                    ida: Some(no()),
                    vuelta: None,
                },
            ),
        ];

        for leg in [Leg::Ida, Leg::Vuelta] {
            let bucket = aggregate_roster(&schedules, &day(), leg);
            assert_eq!(bucket_members(&bucket), schedules.len(), "leg {leg}");
        }
    }

    #[test]
    fn aggregation_is_idempotent() {
        let schedules = vec![
            rider(
                "Ana",
                DayPlan {
                    ida: Some(yes("Congreso")),
                    vuelta: None,
                },
            ),
            rider(
                "Beto",
                DayPlan {
                    ida: Some(no()),
                    vuelta: Some(no()),
                },
            ),
        ];
        let first = aggregate_roster(&schedules, &day(), Leg::Vuelta);
        let second = aggregate_roster(&schedules, &day(), Leg::Vuelta);
        assert_eq!(first, second);
    }

    #[test]
    fn vuelta_roster_splits_return_status_of_morning_riders() {
        let confirmed = rider(
            "Ana",
            DayPlan {
                ida: Some(yes("Congreso")),
                vuelta: Some(yes("Retiro")),
            },
        );
        let no_return = rider(
            "Beto",
            DayPlan {
                ida: Some(yes("Congreso")),
                vuelta: Some(no()),
            },
        );
        let pending_silent = rider(
            "Carla",
            DayPlan {
                ida: Some(yes("Vedia")),
                vuelta: None,
            },
        );
        let pending_stale = rider(
            "Dario",
            DayPlan {
                ida: Some(yes("Vedia")),
                vuelta: Some(LegEntry {
                    confirmed_date: Some(date(2026, 8, 3)),
                    ..yes("Retiro")
                }),
            },
        );
        let stayed_home = rider(
            "Elsa",
            DayPlan {
                ida: Some(no()),
                vuelta: None,
            },
        );
        let schedules = vec![confirmed, no_return, pending_silent, pending_stale, stayed_home];

        let bucket = aggregate_roster(&schedules, &day(), Leg::Vuelta);
        let status = bucket.return_status.expect("vuelta computes return status");
        assert_eq!(status.confirmed, vec!["Ana".to_string()]);
        assert_eq!(status.no_return, vec!["Beto".to_string()]);
        assert_eq!(
            status.pending,
            vec!["Carla".to_string(), "Dario".to_string()]
        );

        let ida_bucket = aggregate_roster(&schedules, &day(), Leg::Ida);
        assert!(ida_bucket.return_status.is_none());
    }
}
