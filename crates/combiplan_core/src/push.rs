//! Push delivery contracts and best-effort multicast fan-out.
//!
//! # Responsibility
//! - Define the transport-neutral push message and per-target outcomes.
//! - Fan one message out to many targets in transport-sized batches.
//!
//! # Invariants
//! - One target's failure never aborts delivery to the others.
//! - A batch-level transport failure marks that batch failed and the
//!   fan-out continues with the next batch.
//! - Fan-out performs a single pass: no per-target retry, no backoff.

use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Largest target count accepted by one transport call. Observed ceiling
/// of the backing multicast API.
pub const MULTICAST_BATCH_LIMIT: usize = 500;

/// Notification payload delivered to every target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
}

impl PushMessage {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

/// Outcome of one delivery attempt to one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetOutcome {
    Delivered,
    /// Transient or unknown failure; the target stays registered.
    Failed(String),
    /// The target is invalid or unregistered and should be pruned.
    Unregistered,
}

/// Batch-level transport failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushError {
    pub message: String,
}

impl PushError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Display for PushError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "push transport failure: {}", self.message)
    }
}

impl Error for PushError {}

/// Transport interface provided by the host (e.g. an FCM adapter).
pub trait PushTransport {
    /// Delivers `message` to every target in one batch call.
    ///
    /// Returns one outcome per target, aligned with the input order.
    ///
    /// # Errors
    /// - Returns [`PushError`] when the whole batch call fails (network,
    ///   transport misconfiguration). Per-target problems are outcomes,
    ///   not errors.
    fn send_multicast(
        &self,
        message: &PushMessage,
        targets: &[String],
    ) -> Result<Vec<TargetOutcome>, PushError>;
}

impl<T: PushTransport + ?Sized> PushTransport for &T {
    fn send_multicast(
        &self,
        message: &PushMessage,
        targets: &[String],
    ) -> Result<Vec<TargetOutcome>, PushError> {
        (**self).send_multicast(message, targets)
    }
}

/// Aggregated accounting for one fan-out pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
    /// Targets reported invalid/unregistered, collected for pruning.
    /// Each also counts under `failed`.
    pub unregistered_targets: Vec<String>,
}

impl DeliveryReport {
    /// Total targets this pass attempted.
    pub fn attempted(&self) -> usize {
        self.delivered + self.failed
    }
}

/// Delivers `message` to all `targets`, chunking at the transport ceiling.
///
/// Strictly best-effort: the report records what happened, nothing is
/// retried and nothing is rolled back.
pub fn fan_out<T: PushTransport + ?Sized>(
    transport: &T,
    message: &PushMessage,
    targets: &[String],
) -> DeliveryReport {
    let mut report = DeliveryReport::default();
    if targets.is_empty() {
        return report;
    }

    for chunk in targets.chunks(MULTICAST_BATCH_LIMIT) {
        match transport.send_multicast(message, chunk) {
            Ok(outcomes) => {
                for (index, target) in chunk.iter().enumerate() {
                    match outcomes.get(index) {
                        Some(TargetOutcome::Delivered) => report.delivered += 1,
                        Some(TargetOutcome::Failed(reason)) => {
                            warn!(
                                "event=push_send module=push status=error error_code=delivery_failed error={reason}"
                            );
                            report.failed += 1;
                        }
                        Some(TargetOutcome::Unregistered) => {
                            report.failed += 1;
                            report.unregistered_targets.push(target.clone());
                        }
                        // Transport returned fewer outcomes than targets.
                        None => report.failed += 1,
                    }
                }
            }
            Err(err) => {
                warn!(
                    "event=push_send module=push status=error error_code=batch_failed batch_size={} error={err}",
                    chunk.len()
                );
                report.failed += chunk.len();
            }
        }
    }

    if report.delivered == 0 {
        warn!(
            "event=push_fanout module=push status=warn delivered=0 failed={}",
            report.failed
        );
    } else {
        info!(
            "event=push_fanout module=push status=ok delivered={} failed={}",
            report.delivered, report.failed
        );
    }

    report
}
