//! Per-user notification delivery preference.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use sitepulse_core::types::UserId;

use super::channel::NotificationChannel;
use super::context::BoundedContext;

/// One (user, context, channel) preference row.
///
/// Absence of a row means the pair is enabled. Preferences only suppress
/// catalog entries with `can_be_disabled = true`; non-disableable types
/// always fan out.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NotificationPreference {
    /// The user these preferences belong to (a foreign identity).
    pub user_id: UserId,
    /// The bounded context being toggled.
    pub context: BoundedContext,
    /// The channel being toggled.
    pub channel: NotificationChannel,
    /// Whether delivery over this (context, channel) pair is enabled.
    pub enabled: bool,
    /// When the preference was last updated.
    pub updated_at: DateTime<Utc>,
}

impl NotificationPreference {
    /// Create a preference row.
    pub fn new(
        user_id: UserId,
        context: BoundedContext,
        channel: NotificationChannel,
        enabled: bool,
    ) -> Self {
        Self {
            user_id,
            context,
            channel,
            enabled,
            updated_at: Utc::now(),
        }
    }
}
