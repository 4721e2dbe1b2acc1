//! Bounded-context tag enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The bounded context a notification originates from.
///
/// Used for preference matching: users can mute a (context, channel) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "bounded_context", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BoundedContext {
    /// Cross-cutting system events.
    System,
    /// Project lifecycle events.
    Projects,
    /// Personnel and attendance events.
    Personnel,
    /// Material stock events.
    Materials,
    /// Machinery fleet events.
    Machinery,
    /// Incident reporting events.
    Incidents,
}

impl BoundedContext {
    /// Return the context as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Projects => "projects",
            Self::Personnel => "personnel",
            Self::Materials => "materials",
            Self::Machinery => "machinery",
            Self::Incidents => "incidents",
        }
    }
}

impl fmt::Display for BoundedContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BoundedContext {
    type Err = sitepulse_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "system" => Ok(Self::System),
            "projects" => Ok(Self::Projects),
            "personnel" => Ok(Self::Personnel),
            "materials" => Ok(Self::Materials),
            "machinery" => Ok(Self::Machinery),
            "incidents" => Ok(Self::Incidents),
            _ => Err(sitepulse_core::AppError::validation(format!(
                "Invalid bounded context: '{s}'"
            ))),
        }
    }
}
