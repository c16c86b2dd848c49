use chrono::NaiveDate;
use combiplan_core::db::open_db_in_memory;
use combiplan_core::{
    DayPlan, DayWindow, LegEntry, RiderId, RiderSchedule, RosterService, ScheduleService,
    SqliteScheduleRepository, Weekday,
};

fn rider(raw: &str) -> RiderId {
    RiderId::new(raw).expect("valid test rider")
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid test date")
}

fn target_day() -> DayWindow {
    DayWindow {
        weekday: Weekday::Lunes,
        date: date(2026, 8, 10),
    }
}

fn yes(stop: &str) -> LegEntry {
    LegEntry {
        riding: Some(true),
        stop: Some(stop.to_string()),
        ..LegEntry::default()
    }
}

fn no() -> LegEntry {
    LegEntry {
        riding: Some(false),
        ..LegEntry::default()
    }
}

fn save(service: &ScheduleService<SqliteScheduleRepository<'_>>, name: &str, plan: DayPlan) {
    let mut schedule = RiderSchedule::empty(
        rider(&format!("{}@example.com", name.to_lowercase())),
        name,
    );
    schedule.days.insert(Weekday::Lunes, plan);
    service
        .save(&schedule, &[target_day()])
        .expect("save should succeed");
}

#[test]
fn day_roster_classifies_stored_schedules_end_to_end() {
    let conn = open_db_in_memory().unwrap();
    let schedules = ScheduleService::new(SqliteScheduleRepository::new(&conn));

    save(
        &schedules,
        "Ana",
        DayPlan {
            ida: Some(yes("Congreso")),
            vuelta: Some(yes("Retiro")),
        },
    );
    save(
        &schedules,
        "Beto",
        DayPlan {
            ida: Some(yes("Congreso")),
            vuelta: Some(no()),
        },
    );
    save(
        &schedules,
        "Carla",
        DayPlan {
            ida: Some(yes("Vedia")),
            vuelta: None,
        },
    );
    save(
        &schedules,
        "Dario",
        DayPlan {
            ida: Some(no()),
            vuelta: Some(no()),
        },
    );
    save(
        &schedules,
        "Elsa",
        DayPlan {
            ida: None,
            vuelta: None,
        },
    );

    let roster = RosterService::new(SqliteScheduleRepository::new(&conn))
        .day_roster(&target_day())
        .unwrap();

    // Morning leg: stop groups, the definite double-no, the silent rider.
    assert_eq!(
        roster.ida.by_stop.get("Congreso"),
        Some(&vec!["Ana".to_string(), "Beto".to_string()])
    );
    assert_eq!(
        roster.ida.by_stop.get("Vedia"),
        Some(&vec!["Carla".to_string()])
    );
    assert_eq!(roster.ida.not_traveling, vec!["Dario".to_string()]);
    assert_eq!(roster.ida.unanswered, vec!["Elsa".to_string()]);
    assert!(roster.ida.return_status.is_none());

    // Return leg: Beto said no, Carla never answered.
    assert_eq!(
        roster.vuelta.by_stop.get("Retiro"),
        Some(&vec!["Ana".to_string()])
    );
    let status = roster
        .vuelta
        .return_status
        .as_ref()
        .expect("vuelta computes return status");
    assert_eq!(status.confirmed, vec!["Ana".to_string()]);
    assert_eq!(status.no_return, vec!["Beto".to_string()]);
    assert_eq!(status.pending, vec!["Carla".to_string()]);
}

#[test]
fn roster_covers_every_stored_rider_exactly_once_per_leg() {
    let conn = open_db_in_memory().unwrap();
    let schedules = ScheduleService::new(SqliteScheduleRepository::new(&conn));

    save(
        &schedules,
        "Ana",
        DayPlan {
            ida: Some(yes("Congreso")),
            vuelta: None,
        },
    );
    save(
        &schedules,
        "Beto",
        DayPlan {
            ida: Some(no()),
            vuelta: None,
        },
    );
    save(
        &schedules,
        "Carla",
        DayPlan {
            ida: None,
            vuelta: None,
        },
    );

    let roster = RosterService::new(SqliteScheduleRepository::new(&conn))
        .day_roster(&target_day())
        .unwrap();

    for bucket in [&roster.ida, &roster.vuelta] {
        let grouped: usize = bucket.by_stop.values().map(Vec::len).sum();
        assert_eq!(
            grouped + bucket.not_traveling.len() + bucket.unanswered.len(),
            3
        );
    }
}

#[test]
fn rider_with_corrupt_day_document_shows_up_as_unanswered() {
    let conn = open_db_in_memory().unwrap();
    let schedules = ScheduleService::new(SqliteScheduleRepository::new(&conn));

    save(
        &schedules,
        "Ana",
        DayPlan {
            ida: Some(yes("Congreso")),
            vuelta: None,
        },
    );
    conn.execute(
        "INSERT INTO schedules (rider_email, display_name, days_doc)
         VALUES ('beto@example.com', 'Beto', '{broken');",
        [],
    )
    .unwrap();

    let roster = RosterService::new(SqliteScheduleRepository::new(&conn))
        .day_roster(&target_day())
        .unwrap();

    assert_eq!(
        roster.ida.by_stop.get("Congreso"),
        Some(&vec!["Ana".to_string()])
    );
    assert_eq!(roster.ida.unanswered, vec!["Beto".to_string()]);
}
