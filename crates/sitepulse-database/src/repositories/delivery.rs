//! Delivery store backed by PostgreSQL.

use async_trait::async_trait;
use sqlx::PgPool;

use sitepulse_core::error::{AppError, ErrorKind};
use sitepulse_core::types::{DeliveryId, NotificationId};
use sitepulse_core::AppResult;
use sitepulse_entity::NotificationDelivery;

use crate::stores::DeliveryStore;

/// PostgreSQL implementation of [`DeliveryStore`].
#[derive(Debug, Clone)]
pub struct PgDeliveryStore {
    pool: PgPool,
}

impl PgDeliveryStore {
    /// Create a new delivery store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeliveryStore for PgDeliveryStore {
    async fn insert(&self, d: &NotificationDelivery) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO notification_deliveries \
             (id, notification_id, channel, status, attempt_count, last_attempt_at, last_error, sent_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(d.id)
        .bind(d.notification_id)
        .bind(d.channel)
        .bind(d.status)
        .bind(d.attempt_count)
        .bind(d.last_attempt_at)
        .bind(d.last_error.as_deref())
        .bind(d.sent_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to insert delivery", e))?;
        Ok(())
    }

    async fn update(&self, d: &NotificationDelivery) -> AppResult<()> {
        sqlx::query(
            "UPDATE notification_deliveries SET status = $2, attempt_count = $3, \
             last_attempt_at = $4, last_error = $5, sent_at = $6 WHERE id = $1",
        )
        .bind(d.id)
        .bind(d.status)
        .bind(d.attempt_count)
        .bind(d.last_attempt_at)
        .bind(d.last_error.as_deref())
        .bind(d.sent_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update delivery", e))?;
        Ok(())
    }

    async fn find_by_notification(
        &self,
        id: NotificationId,
    ) -> AppResult<Vec<NotificationDelivery>> {
        sqlx::query_as::<_, NotificationDelivery>(
            "SELECT * FROM notification_deliveries WHERE notification_id = $1",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list deliveries", e))
    }

    async fn find_retriable(
        &self,
        max_attempts: i32,
        limit: i64,
    ) -> AppResult<Vec<NotificationDelivery>> {
        sqlx::query_as::<_, NotificationDelivery>(
            "SELECT * FROM notification_deliveries \
             WHERE status IN ('failed', 'retrying') AND attempt_count < $1 \
             ORDER BY last_attempt_at ASC NULLS FIRST LIMIT $2",
        )
        .bind(max_attempts)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to scan retriable deliveries", e)
        })
    }

    async fn claim_for_retry(
        &self,
        id: DeliveryId,
        expected_attempts: i32,
    ) -> AppResult<Option<NotificationDelivery>> {
        // attempt_count doubles as the CAS version so concurrent retry
        // passes cannot double-claim the same row.
        sqlx::query_as::<_, NotificationDelivery>(
            "UPDATE notification_deliveries \
             SET status = 'retrying', attempt_count = attempt_count + 1, last_attempt_at = NOW() \
             WHERE id = $1 AND status IN ('failed', 'retrying') AND attempt_count = $2 \
             RETURNING *",
        )
        .bind(id)
        .bind(expected_attempts)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to claim delivery", e))
    }
}
