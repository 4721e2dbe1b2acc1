//! Delivery channel enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A delivery channel for a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "notification_channel", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    /// The persisted notification row itself, pulled by clients.
    InApp,
    /// An email rendered per notification (or batched into a digest).
    Email,
    /// A live push to connected clients via the realtime gateway.
    WebSocket,
    /// Mobile push. Reserved, not yet active.
    Push,
}

impl NotificationChannel {
    /// Channels that dispatch currently fans out to. Push is reserved.
    pub fn active_channels() -> &'static [NotificationChannel] {
        &[Self::InApp, Self::Email, Self::WebSocket]
    }

    /// Whether a failed delivery on this channel is worth re-attempting.
    ///
    /// InApp deliveries succeed by persisting, and WebSocket pushes to
    /// offline users are deliberate no-ops, so only Email can end up in a
    /// retriable state.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::Email)
    }

    /// Return the channel as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InApp => "in_app",
            Self::Email => "email",
            Self::WebSocket => "web_socket",
            Self::Push => "push",
        }
    }
}

impl fmt::Display for NotificationChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
