//! Trip schedule use-case service.
//!
//! # Responsibility
//! - Provide load/save entry points for a rider's schedule document.
//! - Stamp window dates on save so non-recurring answers expire.
//!
//! # Invariants
//! - A missing document loads as an empty schedule, never an error.
//! - Save validates before persisting; persistence failures propagate so
//!   the rider sees that their save did not land.

use crate::model::rider::RiderId;
use crate::model::schedule::RiderSchedule;
use crate::repo::schedule_repo::ScheduleRepository;
use crate::repo::RepoResult;
use crate::week::DayWindow;
use log::info;

/// Use-case facade over the schedule repository.
pub struct ScheduleService<R: ScheduleRepository> {
    repo: R,
}

impl<R: ScheduleRepository> ScheduleService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Loads one rider's schedule.
    ///
    /// A rider with no stored document gets an empty schedule with no
    /// display name; callers overlay identity data from their own context.
    pub fn load(&self, rider: &RiderId) -> RepoResult<RiderSchedule> {
        Ok(self
            .repo
            .load(rider)?
            .unwrap_or_else(|| RiderSchedule::empty(rider.clone(), "")))
    }

    /// Validates, stamps and replaces one rider's schedule document.
    ///
    /// Every entry on a day inside `window` gets that day's concrete date
    /// as its confirmed date. Returns the stamped document as persisted,
    /// which is also the `after` image handed to the change notifier.
    ///
    /// # Errors
    /// - `RepoError::Validation` when an entry declares travel without a
    ///   stop; nothing is written.
    /// - `RepoError::Db` when the underlying write fails.
    pub fn save(
        &self,
        schedule: &RiderSchedule,
        window: &[DayWindow],
    ) -> RepoResult<RiderSchedule> {
        schedule.validate()?;

        let mut stamped = schedule.clone();
        stamped.stamp_confirmed_dates(window);
        self.repo.save(&stamped)?;

        info!(
            "event=schedule_save module=schedule status=ok rider={} days={}",
            stamped.rider,
            stamped.days.len()
        );

        Ok(stamped)
    }
}
