//! Store traits for the engine's own aggregates.
//!
//! Defined as traits so the engine can run against PostgreSQL in production
//! and against the in-memory stores in unit tests and development mode.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use sitepulse_core::types::{DeliveryId, NotificationId, UserId};
use sitepulse_core::AppResult;
use sitepulse_entity::{
    BoundedContext, Notification, NotificationChannel, NotificationDelivery,
    NotificationPreference,
};

/// Persistence for [`Notification`] aggregates.
#[async_trait]
pub trait NotificationStore: Send + Sync + 'static {
    /// Persist a new notification.
    async fn insert(&self, notification: &Notification) -> AppResult<()>;

    /// Fetch a notification by id.
    async fn find_by_id(&self, id: NotificationId) -> AppResult<Option<Notification>>;

    /// Mark one notification as read for its recipient.
    ///
    /// Idempotent at the row level: returns `true` only when the state
    /// actually changed, `false` when it was already read (leaving
    /// `read_at` untouched) or does not exist.
    async fn mark_read(
        &self,
        id: NotificationId,
        user_id: UserId,
        read_at: DateTime<Utc>,
    ) -> AppResult<bool>;

    /// Mark every unread notification of a user as read. Returns the count.
    async fn mark_all_read(&self, user_id: UserId, read_at: DateTime<Utc>) -> AppResult<u64>;

    /// Count unread notifications for a user.
    async fn unread_count(&self, user_id: UserId) -> AppResult<i64>;

    /// The most recent notifications of a user, newest first.
    async fn find_recent_for_user(
        &self,
        user_id: UserId,
        limit: i64,
    ) -> AppResult<Vec<Notification>>;

    /// Notifications created for a user since a point in time, newest
    /// first. Feeds the daily digest.
    async fn find_since_for_user(
        &self,
        user_id: UserId,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<Notification>>;

    /// Delete read notifications older than the cutoff. Owned deliveries
    /// cascade. Returns the number of rows removed.
    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> AppResult<u64>;
}

/// Persistence for [`NotificationDelivery`] records.
#[async_trait]
pub trait DeliveryStore: Send + Sync + 'static {
    /// Persist a new delivery record.
    async fn insert(&self, delivery: &NotificationDelivery) -> AppResult<()>;

    /// Persist the mutated state of an existing delivery.
    async fn update(&self, delivery: &NotificationDelivery) -> AppResult<()>;

    /// All delivery records of one notification.
    async fn find_by_notification(
        &self,
        id: NotificationId,
    ) -> AppResult<Vec<NotificationDelivery>>;

    /// Deliveries eligible for a retry pass: retriable status and fewer
    /// than `max_attempts` attempts.
    async fn find_retriable(
        &self,
        max_attempts: i32,
        limit: i64,
    ) -> AppResult<Vec<NotificationDelivery>>;

    /// Atomically claim a delivery for retry.
    ///
    /// Compare-and-swap on `(status, attempt_count)`: flips the status to
    /// `Retrying` and increments the attempt count only if the row still
    /// has a retriable status and exactly `expected_attempts` attempts.
    /// Returns the claimed row, or `None` when another pass won the race.
    async fn claim_for_retry(
        &self,
        id: DeliveryId,
        expected_attempts: i32,
    ) -> AppResult<Option<NotificationDelivery>>;
}

/// Persistence for [`NotificationPreference`] rows.
#[async_trait]
pub trait PreferenceStore: Send + Sync + 'static {
    /// Whether a (user, context, channel) pair is enabled. Absent rows
    /// default to enabled.
    async fn is_enabled(
        &self,
        user_id: UserId,
        context: BoundedContext,
        channel: NotificationChannel,
    ) -> AppResult<bool>;

    /// Insert or update a preference row.
    async fn upsert(&self, preference: &NotificationPreference) -> AppResult<()>;

    /// All preference rows of a user.
    async fn find_for_user(&self, user_id: UserId) -> AppResult<Vec<NotificationPreference>>;
}
