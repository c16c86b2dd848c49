//! Core domain logic for CombiPlan, a recurring shuttle coordination service.
//! This crate is the single source of truth for business invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod push;
pub mod repo;
pub mod service;
pub mod week;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::rider::{RiderId, RiderIdError, RiderProfile};
pub use model::schedule::{
    DayPlan, Leg, LegEntry, RiderSchedule, ScheduleValidationError,
};
pub use push::{
    fan_out, DeliveryReport, PushError, PushMessage, PushTransport, TargetOutcome,
    MULTICAST_BATCH_LIMIT,
};
pub use repo::rider_repo::{RiderDirectory, SqliteRiderDirectory};
pub use repo::schedule_repo::{ScheduleRepository, SqliteScheduleRepository};
pub use repo::{RepoError, RepoResult};
pub use service::notify_service::{
    classify_trip_change, BroadcastReceipt, ChatMessage, ChatNotifyOutcome, NotifierConfig,
    NotifyError, NotifyService, TripChange, TripUpdateOutcome,
};
pub use service::roster_service::{
    aggregate_roster, DayRoster, ReturnStatus, RosterBucket, RosterService,
};
pub use service::schedule_service::ScheduleService;
pub use week::{
    resolve_week_window, service_now, DayWindow, Weekday, DAY_ROLLOVER_HOUR, WINDOW_DAYS,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
