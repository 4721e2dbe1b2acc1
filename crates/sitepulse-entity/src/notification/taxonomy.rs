//! Static notification taxonomy.
//!
//! The catalog is an explicit compile-time table keyed by `(name, role)` so
//! it stays auditable. The same name may appear under different roles; those
//! are distinct entries.

use serde::Serialize;
use thiserror::Error;

use super::scope::NotificationScope;
use crate::user::UserRole;

/// Stable type name constants.
pub mod names {
    /// A new user account was created.
    pub const USER_CREATED: &str = "USER_CREATED";
    /// Scheduled platform maintenance. Never suppressible.
    pub const SYSTEM_MAINTENANCE: &str = "SYSTEM_MAINTENANCE";
    /// A project was created and assigned to its manager.
    pub const PROJECT_CREATED: &str = "PROJECT_CREATED";
    /// A project changed status; also used by the weekly review sweep.
    pub const PROJECT_STATUS_CHANGED: &str = "PROJECT_STATUS_CHANGED";
    /// A supervisor was assigned to a project.
    pub const PROJECT_ASSIGNED: &str = "PROJECT_ASSIGNED";
    /// Personnel added to a project roster.
    pub const PERSONNEL_ADDED: &str = "PERSONNEL_ADDED";
    /// Project attendance rate fell below the configured threshold.
    pub const LOW_ATTENDANCE: &str = "LOW_ATTENDANCE";
    /// Material stock below minimum.
    pub const LOW_STOCK: &str = "LOW_STOCK";
    /// Material stock at or below half the minimum. Never suppressible.
    pub const CRITICAL_STOCK: &str = "CRITICAL_STOCK";
    /// Material assigned to a project.
    pub const MATERIAL_ASSIGNED: &str = "MATERIAL_ASSIGNED";
    /// Machinery assigned to a project.
    pub const MACHINERY_ASSIGNED: &str = "MACHINERY_ASSIGNED";
    /// Project has fewer active machinery units than the minimum.
    pub const MACHINERY_SHORTAGE: &str = "MACHINERY_SHORTAGE";
    /// An incident was reported.
    pub const INCIDENT_REPORTED: &str = "INCIDENT_REPORTED";
    /// Open-incident backlog exceeds the configured threshold.
    pub const INCIDENT_BACKLOG: &str = "INCIDENT_BACKLOG";
    /// A critical-severity incident was reported. Never suppressible.
    pub const CRITICAL_INCIDENT: &str = "CRITICAL_INCIDENT";
}

/// An immutable catalog entry. Entries are keyed by `(name, target_role)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NotificationType {
    /// Stable string key.
    pub name: &'static str,
    /// The role this entry addresses.
    pub target_role: UserRole,
    /// Default audience breadth for this entry.
    pub scope: NotificationScope,
    /// Whether users may suppress it via preferences.
    pub can_be_disabled: bool,
}

impl NotificationType {
    const fn new(
        name: &'static str,
        target_role: UserRole,
        scope: NotificationScope,
        can_be_disabled: bool,
    ) -> Self {
        Self {
            name,
            target_role,
            scope,
            can_be_disabled,
        }
    }
}

/// Lookup of an unknown `(name, role)` combination.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown notification type '{name}' for role '{role}'")]
pub struct UnknownTypeError {
    /// The requested type name.
    pub name: String,
    /// The requested role.
    pub role: UserRole,
}

/// The closed catalog. Duplicate names bound to different roles are
/// intentional and distinct.
pub const CATALOG: &[NotificationType] = &[
    NotificationType::new(
        names::USER_CREATED,
        UserRole::Admin,
        NotificationScope::System,
        true,
    ),
    NotificationType::new(
        names::SYSTEM_MAINTENANCE,
        UserRole::Admin,
        NotificationScope::System,
        false,
    ),
    NotificationType::new(
        names::PROJECT_CREATED,
        UserRole::Manager,
        NotificationScope::User,
        true,
    ),
    NotificationType::new(
        names::PROJECT_STATUS_CHANGED,
        UserRole::Manager,
        NotificationScope::Project,
        true,
    ),
    NotificationType::new(
        names::PROJECT_ASSIGNED,
        UserRole::Supervisor,
        NotificationScope::User,
        true,
    ),
    NotificationType::new(
        names::PERSONNEL_ADDED,
        UserRole::Manager,
        NotificationScope::Project,
        true,
    ),
    NotificationType::new(
        names::PERSONNEL_ADDED,
        UserRole::Supervisor,
        NotificationScope::Project,
        true,
    ),
    NotificationType::new(
        names::LOW_ATTENDANCE,
        UserRole::Manager,
        NotificationScope::Project,
        true,
    ),
    NotificationType::new(
        names::LOW_STOCK,
        UserRole::Manager,
        NotificationScope::Project,
        true,
    ),
    NotificationType::new(
        names::CRITICAL_STOCK,
        UserRole::Manager,
        NotificationScope::Project,
        false,
    ),
    NotificationType::new(
        names::MATERIAL_ASSIGNED,
        UserRole::Supervisor,
        NotificationScope::Project,
        true,
    ),
    NotificationType::new(
        names::MACHINERY_ASSIGNED,
        UserRole::Supervisor,
        NotificationScope::Project,
        true,
    ),
    NotificationType::new(
        names::MACHINERY_SHORTAGE,
        UserRole::Manager,
        NotificationScope::Project,
        true,
    ),
    NotificationType::new(
        names::INCIDENT_REPORTED,
        UserRole::Manager,
        NotificationScope::Project,
        true,
    ),
    NotificationType::new(
        names::INCIDENT_REPORTED,
        UserRole::Admin,
        NotificationScope::System,
        true,
    ),
    NotificationType::new(
        names::INCIDENT_BACKLOG,
        UserRole::Manager,
        NotificationScope::Project,
        true,
    ),
    NotificationType::new(
        names::CRITICAL_INCIDENT,
        UserRole::Admin,
        NotificationScope::System,
        false,
    ),
];

/// Resolve a catalog entry by `(name, role)`.
pub fn resolve(name: &str, role: UserRole) -> Result<&'static NotificationType, UnknownTypeError> {
    CATALOG
        .iter()
        .find(|t| t.name == name && t.target_role == role)
        .ok_or_else(|| UnknownTypeError {
            name: name.to_string(),
            role,
        })
}

/// All catalog entries addressing a role.
pub fn types_for_role(role: UserRole) -> Vec<&'static NotificationType> {
    CATALOG.iter().filter(|t| t.target_role == role).collect()
}
