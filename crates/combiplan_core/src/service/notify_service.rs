//! Schedule-change, chat and broadcast notification pipeline.
//!
//! # Responsibility
//! - Decide whether a schedule edit is a last-minute, notable change.
//! - Fan push notifications out to the right audience and prune dead
//!   push targets afterwards.
//!
//! # Invariants
//! - Notification is best-effort: delivery failures never surface to the
//!   rider whose save triggered them and never roll anything back.
//! - The acting rider's own push target is never in the audience, even
//!   when the same target value is registered under another directory row.
//! - Gates are evaluated once, synchronously, at trigger time; there is
//!   no scheduled job.

use crate::model::rider::RiderId;
use crate::model::schedule::{Leg, LegEntry, RiderSchedule};
use crate::push::{fan_out, DeliveryReport, PushMessage, PushTransport};
use crate::repo::rider_repo::RiderDirectory;
use crate::repo::{RepoError, RepoResult};
use crate::week::Weekday;
use chrono::{NaiveDateTime, Timelike};
use log::{debug, info, warn};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Title of every last-minute schedule-change notification.
pub const LAST_MINUTE_TITLE: &str = "📢 Aviso de CombiPlan";

/// Stop text used when a joining rider has not named a stop.
pub const DEFAULT_STOP_LABEL: &str = "su parada habitual";

/// Sender text used when a chat message carries no sender name.
pub const DEFAULT_SENDER_LABEL: &str = "Usuario";

/// Rider text used when a schedule carries no display name.
pub const DEFAULT_RIDER_LABEL: &str = "Un pasajero";

/// Gating and authorization knobs for the notifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifierConfig {
    /// Start of the last-minute window, minutes since local midnight.
    pub window_start_min: u32,
    /// End of the last-minute window, inclusive, minutes since midnight.
    pub window_end_min: u32,
    /// Identities granted broadcast rights besides directory admins.
    pub admin_allowlist: Vec<String>,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            // 07:00 through 08:30.
            window_start_min: 7 * 60,
            window_end_min: 8 * 60 + 30,
            admin_allowlist: Vec::new(),
        }
    }
}

/// Notable last-minute transitions of today's morning leg.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TripChange {
    /// Was traveling, now explicitly not.
    DroppedOut,
    /// Was not traveling (or silent), now traveling.
    Joined { stop: String },
    /// Still traveling, from a different stop.
    StopChanged { stop: String },
}

impl TripChange {
    /// Renders the rider-facing notification body.
    pub fn render(&self, rider_name: &str) -> String {
        match self {
            TripChange::DroppedOut => {
                format!("🚫 Cambio de último momento: {rider_name} YA NO viaja hoy.")
            }
            TripChange::Joined { stop } => {
                format!("✅ Cambio de último momento: {rider_name} SE SUMA hoy (Sube en {stop}).")
            }
            TripChange::StopChanged { stop } => {
                format!("🚏 Cambio de último momento: {rider_name} cambia parada a {stop}.")
            }
        }
    }
}

/// Classifies a before/after pair of today's ida entries.
///
/// Returns `None` for every transition that is not worth broadcasting;
/// that is a valid terminal state, not an error. The raw entries are
/// compared as stored: the gates already restrict this path to today.
pub fn classify_trip_change(
    before: Option<&LegEntry>,
    after: Option<&LegEntry>,
) -> Option<TripChange> {
    let before_riding = before.and_then(|entry| entry.riding);
    let after_riding = after.and_then(|entry| entry.riding);

    match (before_riding, after_riding) {
        (Some(true), Some(false)) => Some(TripChange::DroppedOut),
        (previous, Some(true)) if previous != Some(true) => {
            let stop = named_stop(after)
                .unwrap_or(DEFAULT_STOP_LABEL)
                .to_string();
            Some(TripChange::Joined { stop })
        }
        (Some(true), Some(true)) => {
            let before_stop = named_stop(before);
            let after_stop = named_stop(after);
            if before_stop != after_stop {
                Some(TripChange::StopChanged {
                    stop: after_stop.unwrap_or(DEFAULT_STOP_LABEL).to_string(),
                })
            } else {
                None
            }
        }
        _ => None,
    }
}

fn named_stop(entry: Option<&LegEntry>) -> Option<&str> {
    entry
        .and_then(|entry| entry.stop.as_deref())
        .filter(|stop| !stop.trim().is_empty())
}

/// Terminal states of one schedule-update trigger invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TripUpdateOutcome {
    /// Current time is outside the last-minute window.
    OutsideWindow,
    /// The service does not run on weekends.
    Weekend,
    /// The edit did not change today's ida in a notable way.
    NoNotableChange,
    /// Nobody to notify (no targets, or the directory was unreadable).
    NoAudience,
    Sent(DeliveryReport),
}

/// Terminal states of one chat-message trigger invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatNotifyOutcome {
    /// Message had no text or no sender; nothing to deliver.
    SkippedEmptyMessage,
    /// Nobody to notify (no targets, or the directory was unreadable).
    NoAudience,
    Sent(DeliveryReport),
}

/// One created chat record, as handed over by the trigger harness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: Uuid,
    pub sender_email: String,
    pub sender_name: Option<String>,
    pub text: String,
}

impl ChatMessage {
    pub fn new(
        sender_email: impl Into<String>,
        sender_name: Option<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender_email: sender_email.into(),
            sender_name,
            text: text.into(),
        }
    }
}

/// Delivery counts returned to the broadcast caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastReceipt {
    pub sent: usize,
    pub failed: usize,
}

/// Broadcast request failures, surfaced synchronously before any fan-out.
#[derive(Debug)]
pub enum NotifyError {
    /// Missing required field.
    InvalidRequest(&'static str),
    /// Actor is not an admin.
    Unauthorized(String),
    /// Directory could not be read for a path whose purpose is delivery.
    Repo(RepoError),
}

impl Display for NotifyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRequest(field) => write!(f, "invalid request: {field}"),
            Self::Unauthorized(actor) => write!(f, "not authorized to broadcast: {actor}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for NotifyError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for NotifyError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Notification pipeline over a rider directory and a push transport.
pub struct NotifyService<D: RiderDirectory, T: PushTransport> {
    directory: D,
    transport: T,
    config: NotifierConfig,
}

impl<D: RiderDirectory, T: PushTransport> NotifyService<D, T> {
    pub fn new(directory: D, transport: T, config: NotifierConfig) -> Self {
        Self {
            directory,
            transport,
            config,
        }
    }

    /// Trigger entry point for an accepted schedule save.
    ///
    /// Gates on the last-minute window and on today being a business day,
    /// classifies the before/after pair of today's ida entry, and fans a
    /// notification out to everyone but the acting rider. `now` is the
    /// service-local wall clock at trigger time.
    pub fn on_schedule_updated(
        &self,
        rider: &RiderId,
        before: &RiderSchedule,
        after: &RiderSchedule,
        now: NaiveDateTime,
    ) -> TripUpdateOutcome {
        let minute_of_day = now.hour() * 60 + now.minute();
        if minute_of_day < self.config.window_start_min
            || minute_of_day > self.config.window_end_min
        {
            debug!(
                "event=trip_update module=notify status=skip reason=outside_window rider={rider} minute={minute_of_day}"
            );
            return TripUpdateOutcome::OutsideWindow;
        }

        let Some(today) = Weekday::from_date(now.date()) else {
            debug!("event=trip_update module=notify status=skip reason=weekend rider={rider}");
            return TripUpdateOutcome::Weekend;
        };

        let change = classify_trip_change(
            before.entry(today, Leg::Ida),
            after.entry(today, Leg::Ida),
        );
        let Some(change) = change else {
            debug!(
                "event=trip_update module=notify status=skip reason=no_notable_change rider={rider} day={today}"
            );
            return TripUpdateOutcome::NoNotableChange;
        };

        let rider_name = if after.display_name.trim().is_empty() {
            DEFAULT_RIDER_LABEL
        } else {
            after.display_name.as_str()
        };
        let message = PushMessage::new(LAST_MINUTE_TITLE, change.render(rider_name));

        let targets = match self.audience(Some(rider.as_str())) {
            Ok(targets) => targets,
            Err(err) => {
                warn!(
                    "event=trip_update module=notify status=error error_code=audience_unavailable error={err}"
                );
                return TripUpdateOutcome::NoAudience;
            }
        };
        if targets.is_empty() {
            return TripUpdateOutcome::NoAudience;
        }

        info!(
            "event=trip_update module=notify status=send rider={rider} day={today} targets={}",
            targets.len()
        );
        let report = fan_out(&self.transport, &message, &targets);
        self.prune_unregistered(&report);
        TripUpdateOutcome::Sent(report)
    }

    /// Trigger entry point for a created chat message.
    ///
    /// Fans out to every rider except the sender. Chat storage itself is
    /// out of scope; the created record arrives as input.
    pub fn on_chat_message_created(&self, message: &ChatMessage) -> ChatNotifyOutcome {
        let sender_email = message.sender_email.trim().to_lowercase();
        if message.text.trim().is_empty() || sender_email.is_empty() {
            info!(
                "event=chat_notify module=notify status=skip reason=empty_message id={}",
                message.id
            );
            return ChatNotifyOutcome::SkippedEmptyMessage;
        }

        let sender_name = message
            .sender_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_SENDER_LABEL);
        let push = PushMessage::new(format!("💬 {sender_name}"), message.text.clone());

        let targets = match self.audience(Some(&sender_email)) {
            Ok(targets) => targets,
            Err(err) => {
                warn!(
                    "event=chat_notify module=notify status=error error_code=audience_unavailable error={err}"
                );
                return ChatNotifyOutcome::NoAudience;
            }
        };
        if targets.is_empty() {
            return ChatNotifyOutcome::NoAudience;
        }

        info!(
            "event=chat_notify module=notify status=send id={} targets={}",
            message.id,
            targets.len()
        );
        let report = fan_out(&self.transport, &push, &targets);
        self.prune_unregistered(&report);
        ChatNotifyOutcome::Sent(report)
    }

    /// Request entry point for an administrator broadcast.
    ///
    /// Unlike the trigger paths, delivery is the whole point here, so
    /// directory failures and delivery counts surface to the caller.
    /// The audience is every registered target, the actor included.
    ///
    /// # Errors
    /// - [`NotifyError::InvalidRequest`] when title or body is empty.
    /// - [`NotifyError::Unauthorized`] when the actor is not an admin.
    /// - [`NotifyError::Repo`] when the directory cannot be read.
    pub fn send_broadcast(
        &self,
        actor: &RiderId,
        title: &str,
        body: &str,
    ) -> Result<BroadcastReceipt, NotifyError> {
        if title.trim().is_empty() {
            return Err(NotifyError::InvalidRequest("title is required"));
        }
        if body.trim().is_empty() {
            return Err(NotifyError::InvalidRequest("body is required"));
        }
        if !self.is_admin(actor) {
            return Err(NotifyError::Unauthorized(actor.to_string()));
        }

        let targets = self.audience(None)?;
        if targets.is_empty() {
            info!("event=broadcast module=notify status=skip reason=no_targets actor={actor}");
            return Ok(BroadcastReceipt { sent: 0, failed: 0 });
        }

        info!(
            "event=broadcast module=notify status=send actor={actor} targets={}",
            targets.len()
        );
        let report = fan_out(
            &self.transport,
            &PushMessage::new(title.trim(), body.trim()),
            &targets,
        );
        self.prune_unregistered(&report);
        Ok(BroadcastReceipt {
            sent: report.delivered,
            failed: report.failed,
        })
    }

    /// Collects deduplicated push targets, optionally excluding one rider.
    ///
    /// Exclusion works on both axes: the rider's own rows are skipped, and
    /// target values registered under those rows are dropped wherever
    /// else they appear.
    fn audience(&self, exclude_email: Option<&str>) -> RepoResult<Vec<String>> {
        let profiles = self.directory.list()?;

        let excluded_tokens: HashSet<&str> = profiles
            .iter()
            .filter(|profile| Some(profile.rider.as_str()) == exclude_email)
            .filter_map(|profile| profile.push_token.as_deref())
            .collect();

        let mut seen = HashSet::new();
        let mut targets = Vec::new();
        for profile in &profiles {
            if Some(profile.rider.as_str()) == exclude_email {
                continue;
            }
            let Some(token) = profile.push_token.as_deref() else {
                continue;
            };
            if token.is_empty() || excluded_tokens.contains(token) {
                continue;
            }
            if seen.insert(token.to_string()) {
                targets.push(token.to_string());
            }
        }

        Ok(targets)
    }

    fn is_admin(&self, actor: &RiderId) -> bool {
        if self
            .config
            .admin_allowlist
            .iter()
            .any(|email| email.eq_ignore_ascii_case(actor.as_str()))
        {
            return true;
        }

        // A directory failure counts as not-admin rather than aborting.
        match self.directory.get(actor) {
            Ok(Some(profile)) => profile.is_admin,
            Ok(None) => false,
            Err(err) => {
                warn!(
                    "event=admin_check module=notify status=error actor={actor} error={err}"
                );
                false
            }
        }
    }

    fn prune_unregistered(&self, report: &DeliveryReport) {
        for token in &report.unregistered_targets {
            match self.directory.clear_push_token(token) {
                Ok(changed) if changed > 0 => {
                    info!("event=push_prune module=notify status=ok profiles={changed}");
                }
                Ok(_) => {}
                Err(err) => {
                    warn!("event=push_prune module=notify status=error error={err}");
                }
            }
        }
    }
}
