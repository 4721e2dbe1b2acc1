//! Notification creation and read-state commands.
//!
//! This is the surface other bounded contexts call. Validation happens
//! before any side effect: an unknown `(type, role)` combination or empty
//! content fails synchronously and leaves nothing behind.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use sitepulse_core::error::ErrorKind;
use sitepulse_core::types::{NotificationId, ProjectId, UserId};
use sitepulse_core::{AppError, AppResult};
use sitepulse_database::NotificationStore;
use sitepulse_entity::notification::taxonomy::{self, NotificationType};
use sitepulse_entity::{
    BoundedContext, Notification, NotificationContent, NotificationPriority, UserRole,
};
use sitepulse_facade::UserFacade;
use sitepulse_realtime::{RealtimeGateway, ServerEvent};

use crate::dispatch::DeliveryDispatcher;
use crate::targeting::TargetingResolver;

/// Input for a notification creation command.
#[derive(Debug, Clone)]
pub struct NotificationDraft {
    pub type_name: String,
    pub context: BoundedContext,
    pub priority: NotificationPriority,
    pub title: String,
    pub message: String,
    pub action_url: Option<String>,
    pub action_text: Option<String>,
    pub related_project_id: Option<ProjectId>,
    pub related_entity: Option<(uuid::Uuid, String)>,
}

impl NotificationDraft {
    pub fn new(
        type_name: impl Into<String>,
        context: BoundedContext,
        priority: NotificationPriority,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            context,
            priority,
            title: title.into(),
            message: message.into(),
            action_url: None,
            action_text: None,
            related_project_id: None,
            related_entity: None,
        }
    }

    pub fn with_action(mut self, url: impl Into<String>, text: impl Into<String>) -> Self {
        self.action_url = Some(url.into());
        self.action_text = Some(text.into());
        self
    }

    pub fn with_project(mut self, project_id: ProjectId) -> Self {
        self.related_project_id = Some(project_id);
        self
    }

    pub fn with_related_entity(mut self, id: uuid::Uuid, entity_type: impl Into<String>) -> Self {
        self.related_entity = Some((id, entity_type.into()));
        self
    }

    fn apply_relations(&self, mut notification: Notification) -> Notification {
        if let Some(project_id) = self.related_project_id {
            notification = notification.with_project(project_id);
        }
        if let Some((id, entity_type)) = &self.related_entity {
            notification = notification.with_related_entity(*id, entity_type.clone());
        }
        notification
    }

    fn content(&self) -> AppResult<NotificationContent> {
        let mut content = NotificationContent::new(&self.title, &self.message)?;
        if let Some(url) = &self.action_url {
            let text = self.action_text.as_deref().unwrap_or("View details");
            content = content.with_action(url, text);
        }
        Ok(content)
    }
}

/// Validates, persists and fans out notifications; owns the read-state
/// commands.
pub struct NotificationCommandService {
    notifications: Arc<dyn NotificationStore>,
    users: Arc<dyn UserFacade>,
    resolver: Arc<TargetingResolver>,
    dispatcher: Arc<DeliveryDispatcher>,
    gateway: Arc<RealtimeGateway>,
}

impl NotificationCommandService {
    pub fn new(
        notifications: Arc<dyn NotificationStore>,
        users: Arc<dyn UserFacade>,
        resolver: Arc<TargetingResolver>,
        dispatcher: Arc<DeliveryDispatcher>,
        gateway: Arc<RealtimeGateway>,
    ) -> Self {
        Self {
            notifications,
            users,
            resolver,
            dispatcher,
            gateway,
        }
    }

    /// Create a notification for one specific user.
    ///
    /// The type is validated against the user's actual role, so a
    /// Manager-targeted type cannot be sent to a Supervisor. Returns the
    /// notification addressed to the user; when the user has muted the
    /// type, nothing is persisted and the unpersisted draft is returned.
    pub async fn create_for_user(
        &self,
        user_id: UserId,
        draft: NotificationDraft,
    ) -> AppResult<Notification> {
        let profile = self
            .users
            .find_by_id(user_id)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::ServiceUnavailable, "Users context unavailable", e)
            })?
            .ok_or_else(|| AppError::not_found(format!("User {user_id} not found")))?;

        let entry = resolve_entry(&draft.type_name, profile.role)?;
        let template = draft.apply_relations(Notification::for_user(
            user_id,
            entry,
            draft.context,
            draft.priority,
            draft.content()?,
        ));

        let mut created = self.fan_out(&template, entry).await?;
        Ok(created.pop().unwrap_or(template))
    }

    /// Create a notification for every active user holding a role.
    pub async fn create_for_role(
        &self,
        role: UserRole,
        draft: NotificationDraft,
    ) -> AppResult<Vec<Notification>> {
        let entry = resolve_entry(&draft.type_name, role)?;
        let template = draft.apply_relations(Notification::for_role(
            entry,
            draft.context,
            draft.priority,
            draft.content()?,
        ));
        self.fan_out(&template, entry).await
    }

    /// Create a notification for a project's stakeholders: its manager,
    /// plus its supervisor for Supervisor-targeted types.
    pub async fn create_for_project(
        &self,
        project_id: ProjectId,
        role: UserRole,
        draft: NotificationDraft,
    ) -> AppResult<Vec<Notification>> {
        let entry = resolve_entry(&draft.type_name, role)?;
        let template = draft.apply_relations(Notification::for_project(
            project_id,
            entry,
            draft.context,
            draft.priority,
            draft.content()?,
        ));
        self.fan_out(&template, entry).await
    }

    /// Mark one notification read on behalf of its recipient. Idempotent;
    /// returns whether state changed. Read acknowledgements and the fresh
    /// unread count are pushed to the user's live connections.
    pub async fn mark_as_read(
        &self,
        notification_id: NotificationId,
        user_id: UserId,
    ) -> AppResult<bool> {
        let notification = self
            .notifications
            .find_by_id(notification_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("Notification {notification_id} not found"))
            })?;
        if notification.target_user_id != Some(user_id) {
            return Err(AppError::not_found(format!(
                "Notification {notification_id} not found"
            )));
        }

        let changed = self
            .notifications
            .mark_read(notification_id, user_id, Utc::now())
            .await?;
        if changed {
            self.gateway
                .push_to_user(user_id, &ServerEvent::NotificationRead { notification_id });
            self.push_unread_count(user_id).await?;
        }
        Ok(changed)
    }

    /// Mark everything unread as read for a user. Returns the count.
    pub async fn mark_all_read(&self, user_id: UserId) -> AppResult<u64> {
        let count = self.notifications.mark_all_read(user_id, Utc::now()).await?;
        if count > 0 {
            self.gateway
                .push_to_user(user_id, &ServerEvent::UnreadCountUpdate { count: 0 });
        }
        Ok(count)
    }

    /// Current unread counter for a user.
    pub async fn unread_count(&self, user_id: UserId) -> AppResult<i64> {
        self.notifications.unread_count(user_id).await
    }

    /// A user's most recent notifications, newest first.
    pub async fn recent_for_user(
        &self,
        user_id: UserId,
        limit: i64,
    ) -> AppResult<Vec<Notification>> {
        self.notifications.find_recent_for_user(user_id, limit).await
    }

    async fn fan_out(
        &self,
        template: &Notification,
        entry: &NotificationType,
    ) -> AppResult<Vec<Notification>> {
        let recipients = self.resolver.resolve(template, entry).await?;
        if recipients.is_empty() {
            debug!(
                type_name = entry.name,
                "notification resolved to zero recipients"
            );
            return Ok(Vec::new());
        }

        let mut created = Vec::with_capacity(recipients.len());
        for user_id in recipients {
            let notification = if template.target_user_id == Some(user_id) {
                template.clone()
            } else {
                template.materialize_for(user_id)
            };
            self.notifications.insert(&notification).await?;
            self.dispatcher.dispatch(&notification, entry).await?;
            self.push_unread_count(user_id).await?;
            created.push(notification);
        }
        info!(
            type_name = entry.name,
            recipients = created.len(),
            "notification fanned out"
        );
        Ok(created)
    }

    async fn push_unread_count(&self, user_id: UserId) -> AppResult<()> {
        if self.gateway.is_online(user_id) {
            let count = self.notifications.unread_count(user_id).await?;
            self.gateway
                .push_to_user(user_id, &ServerEvent::UnreadCountUpdate { count });
        }
        Ok(())
    }
}

fn resolve_entry(type_name: &str, role: UserRole) -> AppResult<&'static NotificationType> {
    taxonomy::resolve(type_name, role).map_err(|e| AppError::validation(e.to_string()))
}
