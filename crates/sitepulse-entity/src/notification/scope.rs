//! Notification scope enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The breadth of a notification's intended audience.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "notification_scope", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NotificationScope {
    /// All active users holding the target role.
    System,
    /// A single project's stakeholders (manager, supervisor).
    Project,
    /// One specific user.
    User,
}

impl NotificationScope {
    /// Return the scope as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Project => "project",
            Self::User => "user",
        }
    }
}

impl fmt::Display for NotificationScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
