//! Notification content value object.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use sitepulse_core::AppError;

/// The displayable content of a notification.
///
/// Validated at construction: title and message must be non-blank. Persisted
/// flattened into the notification row (no separate table).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct NotificationContent {
    /// Short headline.
    pub title: String,
    /// Body text.
    pub message: String,
    /// Optional link target for the call-to-action.
    pub action_url: Option<String>,
    /// Optional call-to-action label.
    pub action_text: Option<String>,
    /// Optional icon CSS class for the frontend.
    pub icon_class: Option<String>,
}

impl NotificationContent {
    /// Create validated content. Fails with a validation error when the
    /// title or message is empty or whitespace-only.
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Result<Self, AppError> {
        let title = title.into().trim().to_string();
        let message = message.into().trim().to_string();

        if title.is_empty() {
            return Err(AppError::validation("Notification title must not be empty"));
        }
        if message.is_empty() {
            return Err(AppError::validation(
                "Notification message must not be empty",
            ));
        }

        Ok(Self {
            title,
            message,
            action_url: None,
            action_text: None,
            icon_class: None,
        })
    }

    /// Attach a call-to-action link.
    pub fn with_action(mut self, url: impl Into<String>, text: impl Into<String>) -> Self {
        self.action_url = Some(url.into());
        self.action_text = Some(text.into());
        self
    }

    /// Attach a frontend icon class.
    pub fn with_icon(mut self, icon_class: impl Into<String>) -> Self {
        self.icon_class = Some(icon_class.into());
        self
    }
}
