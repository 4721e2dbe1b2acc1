//! Per-channel delivery record and its status state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

use sitepulse_core::types::{DeliveryId, NotificationId};

use super::channel::NotificationChannel;

/// Status of one delivery attempt chain.
///
/// Transitions: `Pending -> Sent`, `Pending -> Failed`,
/// `Failed -> Retrying -> Sent | Failed`. There is no transition out of
/// `Sent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "delivery_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    /// Created, no attempt made yet.
    Pending,
    /// Delivered successfully. Terminal.
    Sent,
    /// Last attempt failed.
    Failed,
    /// A retry attempt is in flight.
    Retrying,
}

impl DeliveryStatus {
    /// Whether the retry manager may pick this delivery up.
    pub fn can_retry(&self) -> bool {
        matches!(self, Self::Failed | Self::Retrying)
    }

    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Failed => "failed",
            Self::Retrying => "retrying",
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One (notification, channel) delivery record, owned by its notification
/// (deleted with it).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NotificationDelivery {
    /// Unique delivery identifier.
    pub id: DeliveryId,
    /// The notification being delivered.
    pub notification_id: NotificationId,
    /// The channel this record tracks.
    pub channel: NotificationChannel,
    /// Current status.
    pub status: DeliveryStatus,
    /// Number of attempts made so far.
    pub attempt_count: i32,
    /// Timestamp of the last attempt.
    pub last_attempt_at: Option<DateTime<Utc>>,
    /// Error message from the last failed attempt.
    pub last_error: Option<String>,
    /// When the delivery succeeded.
    pub sent_at: Option<DateTime<Utc>>,
}

impl NotificationDelivery {
    /// Create a fresh `Pending` delivery for a (notification, channel) pair.
    pub fn pending(notification_id: NotificationId, channel: NotificationChannel) -> Self {
        Self {
            id: DeliveryId::new(),
            notification_id,
            channel,
            status: DeliveryStatus::Pending,
            attempt_count: 0,
            last_attempt_at: None,
            last_error: None,
            sent_at: None,
        }
    }

    /// Whether the retry manager may pick this delivery up.
    pub fn can_retry(&self) -> bool {
        self.status.can_retry()
    }

    /// Record a successful send. There is no transition out of `Sent`.
    pub fn mark_sent(&mut self) {
        debug_assert_ne!(self.status, DeliveryStatus::Sent);
        let now = Utc::now();
        self.status = DeliveryStatus::Sent;
        self.attempt_count += 1;
        self.last_attempt_at = Some(now);
        self.last_error = None;
        self.sent_at = Some(now);
    }

    /// Record a failed attempt with the transport error.
    pub fn mark_failed(&mut self, error: impl Into<String>) {
        debug_assert_ne!(self.status, DeliveryStatus::Sent);
        self.status = DeliveryStatus::Failed;
        self.attempt_count += 1;
        self.last_attempt_at = Some(Utc::now());
        self.last_error = Some(error.into());
    }

    /// Flag the delivery as being re-attempted. Only valid from a
    /// retriable state.
    pub fn mark_retrying(&mut self) {
        debug_assert!(self.can_retry());
        self.status = DeliveryStatus::Retrying;
    }

    /// Record the outcome of a claimed retry attempt.
    ///
    /// The claim already incremented `attempt_count` (it doubles as the
    /// compare-and-swap version), so this only settles the status.
    pub fn settle_retry(&mut self, outcome: Result<(), String>) {
        debug_assert_eq!(self.status, DeliveryStatus::Retrying);
        match outcome {
            Ok(()) => {
                self.status = DeliveryStatus::Sent;
                self.last_error = None;
                self.sent_at = Some(Utc::now());
            }
            Err(e) => {
                self.status = DeliveryStatus::Failed;
                self.last_error = Some(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_can_retry_only_for_failed_and_retrying() {
        assert!(!DeliveryStatus::Pending.can_retry());
        assert!(!DeliveryStatus::Sent.can_retry());
        assert!(DeliveryStatus::Failed.can_retry());
        assert!(DeliveryStatus::Retrying.can_retry());
    }

    #[test]
    fn test_failure_then_retry_then_success() {
        let mut d =
            NotificationDelivery::pending(NotificationId::new(), NotificationChannel::Email);
        assert_eq!(d.status, DeliveryStatus::Pending);
        assert_eq!(d.attempt_count, 0);

        d.mark_failed("smtp: connection refused");
        assert_eq!(d.status, DeliveryStatus::Failed);
        assert_eq!(d.attempt_count, 1);
        assert_eq!(d.last_error.as_deref(), Some("smtp: connection refused"));
        assert!(d.sent_at.is_none());

        d.mark_retrying();
        assert_eq!(d.status, DeliveryStatus::Retrying);

        d.mark_sent();
        assert_eq!(d.status, DeliveryStatus::Sent);
        assert_eq!(d.attempt_count, 2);
        assert!(d.last_error.is_none());
        assert!(d.sent_at.is_some());
    }
}
