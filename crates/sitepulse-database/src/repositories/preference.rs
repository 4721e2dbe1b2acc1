//! Preference store backed by PostgreSQL.

use async_trait::async_trait;
use sqlx::PgPool;

use sitepulse_core::error::{AppError, ErrorKind};
use sitepulse_core::types::UserId;
use sitepulse_core::AppResult;
use sitepulse_entity::{BoundedContext, NotificationChannel, NotificationPreference};

use crate::stores::PreferenceStore;

/// PostgreSQL implementation of [`PreferenceStore`].
#[derive(Debug, Clone)]
pub struct PgPreferenceStore {
    pool: PgPool,
}

impl PgPreferenceStore {
    /// Create a new preference store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PreferenceStore for PgPreferenceStore {
    async fn is_enabled(
        &self,
        user_id: UserId,
        context: BoundedContext,
        channel: NotificationChannel,
    ) -> AppResult<bool> {
        let enabled: Option<bool> = sqlx::query_scalar(
            "SELECT enabled FROM notification_preferences \
             WHERE user_id = $1 AND context = $2 AND channel = $3",
        )
        .bind(user_id)
        .bind(context)
        .bind(channel)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to read preference", e))?;

        // No row means the pair was never disabled.
        Ok(enabled.unwrap_or(true))
    }

    async fn upsert(&self, p: &NotificationPreference) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO notification_preferences (user_id, context, channel, enabled, updated_at) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (user_id, context, channel) \
             DO UPDATE SET enabled = $4, updated_at = $5",
        )
        .bind(p.user_id)
        .bind(p.context)
        .bind(p.channel)
        .bind(p.enabled)
        .bind(p.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to upsert preference", e)
        })?;
        Ok(())
    }

    async fn find_for_user(&self, user_id: UserId) -> AppResult<Vec<NotificationPreference>> {
        sqlx::query_as::<_, NotificationPreference>(
            "SELECT * FROM notification_preferences WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list preferences", e))
    }
}
