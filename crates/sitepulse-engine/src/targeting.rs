//! Recipient resolution.

use std::sync::Arc;

use tracing::{debug, warn};

use sitepulse_core::types::UserId;
use sitepulse_core::AppResult;
use sitepulse_entity::notification::taxonomy::NotificationType;
use sitepulse_entity::{Notification, NotificationScope, UserRole};
use sitepulse_facade::{ProjectFacade, SettingsFacade, UserFacade};

/// Turns a notification template into the concrete set of recipients.
///
/// Cross-context lookups are tolerant by contract: an unknown user id is
/// skipped, a project with no supervisor drops Supervisor-targeted
/// recipients silently, and a context outage is logged and treated as
/// "nobody found" rather than failing the business operation.
pub struct TargetingResolver {
    users: Arc<dyn UserFacade>,
    projects: Arc<dyn ProjectFacade>,
    settings: Arc<dyn SettingsFacade>,
}

impl TargetingResolver {
    pub fn new(
        users: Arc<dyn UserFacade>,
        projects: Arc<dyn ProjectFacade>,
        settings: Arc<dyn SettingsFacade>,
    ) -> Self {
        Self {
            users,
            projects,
            settings,
        }
    }

    /// Resolve the recipient set for a notification template.
    pub async fn resolve(
        &self,
        notification: &Notification,
        entry: &NotificationType,
    ) -> AppResult<Vec<UserId>> {
        let candidates = if let Some(user_id) = notification.target_user_id {
            self.explicit_candidate(user_id).await
        } else {
            match notification.scope {
                NotificationScope::System => self.role_candidates(entry.target_role).await,
                NotificationScope::Project => self.project_candidates(notification, entry).await,
                // User scope without a target user cannot happen through
                // the constructors.
                NotificationScope::User => Vec::new(),
            }
        };

        let mut recipients = Vec::with_capacity(candidates.len());
        for user_id in candidates {
            if recipients.contains(&user_id) {
                continue;
            }
            if entry.can_be_disabled && !self.notifications_enabled(user_id).await {
                debug!(%user_id, type_name = entry.name, "recipient muted all notifications");
                continue;
            }
            recipients.push(user_id);
        }
        Ok(recipients)
    }

    async fn explicit_candidate(&self, user_id: UserId) -> Vec<UserId> {
        match self.users.find_by_id(user_id).await {
            Ok(Some(user)) if user.active => vec![user_id],
            Ok(_) => {
                debug!(%user_id, "skipping unknown or inactive explicit recipient");
                Vec::new()
            }
            Err(error) => {
                warn!(%error, %user_id, "users context unavailable, skipping recipient");
                Vec::new()
            }
        }
    }

    async fn role_candidates(&self, role: UserRole) -> Vec<UserId> {
        match self.users.find_active_by_role(role).await {
            Ok(users) => users.into_iter().map(|u| u.id).collect(),
            Err(error) => {
                warn!(%error, %role, "users context unavailable, empty role fan-out");
                Vec::new()
            }
        }
    }

    async fn project_candidates(
        &self,
        notification: &Notification,
        entry: &NotificationType,
    ) -> Vec<UserId> {
        let Some(project_id) = notification.related_project_id else {
            return Vec::new();
        };

        let project = match self.projects.find_by_id(project_id).await {
            Ok(Some(project)) => project,
            Ok(None) => {
                debug!(%project_id, "skipping notification for unknown project");
                return Vec::new();
            }
            Err(error) => {
                warn!(%error, %project_id, "projects context unavailable, empty fan-out");
                return Vec::new();
            }
        };

        let mut candidates = Vec::new();
        if self.is_known_active(project.manager_id).await {
            candidates.push(project.manager_id);
        }
        if entry.target_role == UserRole::Supervisor {
            // A project without an assigned supervisor simply has no
            // supervisor recipient.
            if let Some(supervisor_id) = project.supervisor_id {
                if self.is_known_active(supervisor_id).await {
                    candidates.push(supervisor_id);
                }
            }
        }
        candidates
    }

    async fn is_known_active(&self, user_id: UserId) -> bool {
        match self.users.find_by_id(user_id).await {
            Ok(Some(user)) => user.active,
            Ok(None) => {
                debug!(%user_id, "skipping recipient unknown to the users context");
                false
            }
            Err(error) => {
                warn!(%error, %user_id, "users context unavailable, skipping recipient");
                false
            }
        }
    }

    async fn notifications_enabled(&self, user_id: UserId) -> bool {
        match self.settings.settings_for(user_id).await {
            Ok(settings) => settings.notifications_enabled,
            // Unknown settings default to enabled.
            Err(error) => {
                warn!(%error, %user_id, "configuration context unavailable, assuming enabled");
                true
            }
        }
    }
}
