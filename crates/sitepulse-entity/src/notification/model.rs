//! Notification aggregate root.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use sitepulse_core::types::{NotificationId, ProjectId, UserId};

use super::content::NotificationContent;
use super::context::BoundedContext;
use super::priority::NotificationPriority;
use super::scope::NotificationScope;
use super::taxonomy::NotificationType;
use crate::user::UserRole;

/// A notification created by the command service.
///
/// Exactly one recipient determinant is ever set, enforced by the
/// constructors: a direct target user, a target role with System scope, or
/// Project scope with project-derived recipients.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    /// Unique notification identifier.
    pub id: NotificationId,
    /// Catalog type name (e.g. `LOW_STOCK`).
    pub type_name: String,
    /// Originating bounded context.
    pub context: BoundedContext,
    /// Audience breadth.
    pub scope: NotificationScope,
    /// Priority level.
    pub priority: NotificationPriority,
    /// Displayable content, flattened into the row.
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub content: NotificationContent,
    /// Direct recipient, set only for User scope.
    pub target_user_id: Option<UserId>,
    /// Target role, set only for System scope without an explicit user.
    pub target_role: Option<UserRole>,
    /// The project this notification concerns, if any.
    pub related_project_id: Option<ProjectId>,
    /// Related entity (material, machine, incident, ...), if any.
    pub related_entity_id: Option<Uuid>,
    /// Type tag of the related entity.
    pub related_entity_type: Option<String>,
    /// When the notification was created.
    pub created_at: DateTime<Utc>,
    /// Whether the recipient has read this notification.
    pub is_read: bool,
    /// When the notification was read.
    pub read_at: Option<DateTime<Utc>>,
}

impl Notification {
    /// Create a notification addressed to one specific user.
    pub fn for_user(
        user_id: UserId,
        entry: &NotificationType,
        context: BoundedContext,
        priority: NotificationPriority,
        content: NotificationContent,
    ) -> Self {
        Self::base(entry, NotificationScope::User, context, priority, content)
            .with_target_user(user_id)
    }

    /// Create a notification addressed to every active user with the
    /// catalog entry's target role.
    pub fn for_role(
        entry: &NotificationType,
        context: BoundedContext,
        priority: NotificationPriority,
        content: NotificationContent,
    ) -> Self {
        let mut n = Self::base(entry, NotificationScope::System, context, priority, content);
        n.target_role = Some(entry.target_role);
        n
    }

    /// Create a notification addressed to a project's stakeholders.
    pub fn for_project(
        project_id: ProjectId,
        entry: &NotificationType,
        context: BoundedContext,
        priority: NotificationPriority,
        content: NotificationContent,
    ) -> Self {
        let mut n = Self::base(entry, NotificationScope::Project, context, priority, content);
        n.related_project_id = Some(project_id);
        n
    }

    fn base(
        entry: &NotificationType,
        scope: NotificationScope,
        context: BoundedContext,
        priority: NotificationPriority,
        content: NotificationContent,
    ) -> Self {
        Self {
            id: NotificationId::new(),
            type_name: entry.name.to_string(),
            context,
            scope,
            priority,
            content,
            target_user_id: None,
            target_role: None,
            related_project_id: None,
            related_entity_id: None,
            related_entity_type: None,
            created_at: Utc::now(),
            is_read: false,
            read_at: None,
        }
    }

    fn with_target_user(mut self, user_id: UserId) -> Self {
        self.target_user_id = Some(user_id);
        self
    }

    /// Attach the project this notification concerns.
    pub fn with_project(mut self, project_id: ProjectId) -> Self {
        self.related_project_id = Some(project_id);
        self
    }

    /// Attach the related entity (material, machine, incident, ...).
    pub fn with_related_entity(mut self, id: Uuid, entity_type: impl Into<String>) -> Self {
        self.related_entity_id = Some(id);
        self.related_entity_type = Some(entity_type.into());
        self
    }

    /// Clone this notification for one resolved recipient.
    ///
    /// Fan-out persists one row per recipient: the copy gets a fresh id and
    /// the recipient as its target user, keeping scope and role for
    /// provenance.
    pub fn materialize_for(&self, user_id: UserId) -> Notification {
        let mut copy = self.clone();
        copy.id = NotificationId::new();
        copy.target_user_id = Some(user_id);
        copy.created_at = Utc::now();
        copy
    }

    /// Mark the notification as read. Idempotent: the second call is a
    /// no-op and leaves `read_at` unchanged. Returns whether state changed.
    pub fn mark_as_read(&mut self) -> bool {
        if self.is_read {
            return false;
        }
        self.is_read = true;
        self.read_at = Some(Utc::now());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::taxonomy;

    fn sample() -> Notification {
        let entry = taxonomy::resolve(taxonomy::names::LOW_STOCK, UserRole::Manager).unwrap();
        Notification::for_project(
            ProjectId::new(),
            entry,
            BoundedContext::Materials,
            NotificationPriority::Normal,
            NotificationContent::new("Stock low", "Cement below minimum").unwrap(),
        )
    }

    #[test]
    fn test_mark_as_read_is_idempotent() {
        let mut n = sample();
        assert!(!n.is_read);

        assert!(n.mark_as_read());
        let first_read_at = n.read_at;
        assert!(first_read_at.is_some());

        assert!(!n.mark_as_read());
        assert!(n.is_read);
        assert_eq!(n.read_at, first_read_at);
    }

    #[test]
    fn test_recipient_determinant_is_unambiguous() {
        let entry = taxonomy::resolve(taxonomy::names::USER_CREATED, UserRole::Admin).unwrap();
        let content = NotificationContent::new("t", "m").unwrap();

        let direct = Notification::for_user(
            UserId::new(),
            entry,
            BoundedContext::System,
            NotificationPriority::Normal,
            content.clone(),
        );
        assert!(direct.target_user_id.is_some());
        assert!(direct.target_role.is_none());

        let role_wide = Notification::for_role(
            entry,
            BoundedContext::System,
            NotificationPriority::Normal,
            content,
        );
        assert!(role_wide.target_user_id.is_none());
        assert_eq!(role_wide.target_role, Some(UserRole::Admin));
        assert_eq!(role_wide.scope, NotificationScope::System);

        let project_wide = sample();
        assert!(project_wide.target_user_id.is_none());
        assert!(project_wide.target_role.is_none());
        assert!(project_wide.related_project_id.is_some());
    }
}
