//! Configuration context facade: per-user notification settings.

use async_trait::async_trait;
use sqlx::PgPool;

use sitepulse_core::types::UserId;

use crate::error::{ContextResult, ContextUnavailable};

/// Per-user switches and digest preferences held by the Configuration
/// context. Users without a settings row get the defaults.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserSettings {
    /// Master switch. When off, the user receives nothing on any channel.
    pub notifications_enabled: bool,
    /// Gates the email channel only.
    pub email_enabled: bool,
    /// Local hour of day at which the daily digest should go out.
    pub digest_hour: i32,
    /// IANA timezone name, e.g. `America/Lima`.
    pub timezone: String,
    pub language: String,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            notifications_enabled: true,
            email_enabled: true,
            digest_hour: 7,
            timezone: "UTC".to_string(),
            language: "en".to_string(),
        }
    }
}

#[async_trait]
pub trait SettingsFacade: Send + Sync + 'static {
    /// Settings for a user, falling back to [`UserSettings::default`] when
    /// the user has never saved any.
    async fn settings_for(&self, user_id: UserId) -> ContextResult<UserSettings>;
}

/// Facade reading the Configuration context's own tables.
#[derive(Debug, Clone)]
pub struct PgSettingsFacade {
    pool: PgPool,
}

impl PgSettingsFacade {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsFacade for PgSettingsFacade {
    async fn settings_for(&self, user_id: UserId) -> ContextResult<UserSettings> {
        let row = sqlx::query_as::<_, UserSettings>(
            "SELECT notifications_enabled, email_enabled, digest_hour, timezone, language \
             FROM user_settings WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ContextUnavailable::new("configuration", e))?;

        Ok(row.unwrap_or_default())
    }
}
