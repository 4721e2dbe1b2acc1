//! The email channel: renderer + transport + the facade lookups needed to
//! address a notification.

use std::sync::Arc;

use tracing::{debug, warn};

use sitepulse_core::types::UserId;
use sitepulse_entity::Notification;
use sitepulse_facade::{ProjectFacade, SettingsFacade, UserFacade, UserProfile};

use crate::email::renderer::EmailRenderer;
use crate::email::transport::{EmailTransport, OutboundEmail};

/// Sends notification emails. Shared by the dispatcher (first attempt), the
/// retry manager (re-attempts) and the digest pass.
///
/// Failures are returned as plain strings for recording on the delivery
/// row; they are channel outcomes, not application errors.
pub struct EmailChannel {
    users: Arc<dyn UserFacade>,
    projects: Arc<dyn ProjectFacade>,
    settings: Arc<dyn SettingsFacade>,
    renderer: EmailRenderer,
    transport: Arc<dyn EmailTransport>,
}

impl EmailChannel {
    pub fn new(
        users: Arc<dyn UserFacade>,
        projects: Arc<dyn ProjectFacade>,
        settings: Arc<dyn SettingsFacade>,
        renderer: EmailRenderer,
        transport: Arc<dyn EmailTransport>,
    ) -> Self {
        Self {
            users,
            projects,
            settings,
            renderer,
            transport,
        }
    }

    /// Whether the user has the email channel switched on. Unknown
    /// settings, including a Configuration context outage, default to on.
    pub async fn wants_email(&self, user_id: UserId) -> bool {
        match self.settings.settings_for(user_id).await {
            Ok(settings) => settings.email_enabled,
            Err(error) => {
                warn!(%error, %user_id, "configuration context unavailable, assuming email on");
                true
            }
        }
    }

    /// Render and send one notification email to its target user.
    pub async fn send_notification(&self, notification: &Notification) -> Result<(), String> {
        let Some(user_id) = notification.target_user_id else {
            return Err("notification has no target user".to_string());
        };
        let recipient = match self.users.find_by_id(user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => return Err(format!("recipient {user_id} unknown to the users context")),
            Err(error) => return Err(format!("users context unavailable: {error}")),
        };

        let rendered = if notification.priority.is_critical() {
            let project_name = self.project_name(notification).await;
            self.renderer.render_critical(notification, &project_name)
        } else {
            self.renderer.render_single(notification)
        };

        self.deliver(&recipient, rendered.subject, rendered.html)
            .await
    }

    /// Render and send a daily digest. The caller guarantees `items` is
    /// non-empty.
    pub async fn send_digest(
        &self,
        recipient: &UserProfile,
        items: &[Notification],
        max_items: usize,
    ) -> Result<(), String> {
        let rendered = self.renderer.render_digest(&recipient.name, items, max_items);
        self.deliver(recipient, rendered.subject, rendered.html)
            .await
    }

    async fn deliver(
        &self,
        recipient: &UserProfile,
        subject: String,
        html_body: String,
    ) -> Result<(), String> {
        let email = OutboundEmail {
            to_address: recipient.email.clone(),
            to_name: recipient.name.clone(),
            subject,
            html_body,
        };
        self.transport
            .send(&email)
            .await
            .map_err(|e| e.to_string())?;
        debug!(to = %recipient.email, "email sent");
        Ok(())
    }

    async fn project_name(&self, notification: &Notification) -> String {
        let Some(project_id) = notification.related_project_id else {
            return "Unknown project".to_string();
        };
        match self.projects.find_by_id(project_id).await {
            Ok(Some(project)) => project.name,
            Ok(None) => "Unknown project".to_string(),
            Err(error) => {
                warn!(%error, %project_id, "projects context unavailable for critical email");
                "Unknown project".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitepulse_core::types::{ProjectId, UserId};
    use sitepulse_entity::notification::taxonomy::{self, names};
    use sitepulse_entity::{BoundedContext, NotificationContent, NotificationPriority, UserRole};
    use sitepulse_facade::{InMemoryContext, ProjectSummary};

    use crate::email::transport::MemoryEmailTransport;

    fn channel(ctx: InMemoryContext, transport: Arc<MemoryEmailTransport>) -> EmailChannel {
        let ctx = Arc::new(ctx);
        EmailChannel::new(
            ctx.clone(),
            ctx.clone(),
            ctx,
            EmailRenderer::new("https://sitepulse.example"),
            transport,
        )
    }

    fn manager() -> UserProfile {
        UserProfile {
            id: UserId::new(),
            name: "Rosa Medina".to_string(),
            email: "rosa@example.com".to_string(),
            role: UserRole::Manager,
            active: true,
        }
    }

    #[tokio::test]
    async fn test_critical_email_carries_the_project_name() {
        let recipient = manager();
        let project = ProjectSummary {
            id: ProjectId::new(),
            name: "North Tower".to_string(),
            manager_id: recipient.id,
            supervisor_id: None,
            active: true,
        };
        let mut ctx = InMemoryContext::new();
        ctx.add_user(recipient.clone());
        ctx.add_project(project.clone());

        let entry = taxonomy::resolve(names::CRITICAL_STOCK, UserRole::Manager).unwrap();
        let notification = Notification::for_project(
            project.id,
            entry,
            BoundedContext::Materials,
            NotificationPriority::Critical,
            NotificationContent::new("Stock critical", "Cement at 10% of minimum").unwrap(),
        )
        .materialize_for(recipient.id);

        let transport = Arc::new(MemoryEmailTransport::new());
        channel(ctx, transport.clone())
            .send_notification(&notification)
            .await
            .unwrap();

        let sent = transport.sent().await;
        assert_eq!(sent.len(), 1);
        assert!(sent[0].subject.starts_with("[CRITICAL]"));
        assert!(sent[0].html_body.contains("North Tower"));
        assert_eq!(sent[0].to_address, "rosa@example.com");
    }

    #[tokio::test]
    async fn test_unknown_recipient_is_a_channel_failure() {
        let transport = Arc::new(MemoryEmailTransport::new());
        let entry = taxonomy::resolve(names::PROJECT_CREATED, UserRole::Manager).unwrap();
        let notification = Notification::for_user(
            UserId::new(),
            entry,
            BoundedContext::Projects,
            NotificationPriority::Normal,
            NotificationContent::new("Project created", "North Tower is yours").unwrap(),
        );

        let outcome = channel(InMemoryContext::new(), transport.clone())
            .send_notification(&notification)
            .await;
        assert!(outcome.unwrap_err().contains("unknown"));
        assert!(transport.sent().await.is_empty());
    }
}
