//! Per-channel delivery fan-out.

use std::sync::Arc;

use tracing::{debug, warn};

use sitepulse_core::AppResult;
use sitepulse_database::{DeliveryStore, PreferenceStore};
use sitepulse_entity::notification::taxonomy::NotificationType;
use sitepulse_entity::{Notification, NotificationChannel, NotificationDelivery};
use sitepulse_realtime::{RealtimeGateway, ServerEvent};

use crate::email::channel::EmailChannel;

/// Creates one delivery record per enabled channel for a notification's
/// target user and performs the channel-specific send.
///
/// Channel failures are recorded on the delivery row and never surfaced to
/// the caller; only the engine's own storage failures propagate.
pub struct DeliveryDispatcher {
    deliveries: Arc<dyn DeliveryStore>,
    preferences: Arc<dyn PreferenceStore>,
    gateway: Arc<RealtimeGateway>,
    email: Arc<EmailChannel>,
}

impl DeliveryDispatcher {
    pub fn new(
        deliveries: Arc<dyn DeliveryStore>,
        preferences: Arc<dyn PreferenceStore>,
        gateway: Arc<RealtimeGateway>,
        email: Arc<EmailChannel>,
    ) -> Self {
        Self {
            deliveries,
            preferences,
            gateway,
            email,
        }
    }

    /// Fan a persisted notification out to every channel its recipient has
    /// enabled. Returns the delivery records created.
    pub async fn dispatch(
        &self,
        notification: &Notification,
        entry: &NotificationType,
    ) -> AppResult<Vec<NotificationDelivery>> {
        let Some(user_id) = notification.target_user_id else {
            warn!(
                notification_id = %notification.id,
                "dispatch called on a template without a target user"
            );
            return Ok(Vec::new());
        };

        let mut created = Vec::new();
        for &channel in NotificationChannel::active_channels() {
            if entry.can_be_disabled
                && !self
                    .preferences
                    .is_enabled(user_id, notification.context, channel)
                    .await?
            {
                debug!(%user_id, %channel, "channel suppressed by preference");
                continue;
            }

            let mut delivery = NotificationDelivery::pending(notification.id, channel);
            match channel {
                // Persisting the row is the in-app delivery.
                NotificationChannel::InApp => delivery.mark_sent(),
                NotificationChannel::WebSocket => {
                    let reached = self
                        .gateway
                        .push_to_user(user_id, &ServerEvent::from(notification));
                    if reached == 0 {
                        debug!(%user_id, "recipient offline, websocket push skipped");
                    }
                    // Offline recipients will see the in-app copy; there is
                    // nothing to retry.
                    delivery.mark_sent();
                }
                NotificationChannel::Email => {
                    if entry.can_be_disabled && !self.email.wants_email(user_id).await {
                        debug!(%user_id, "email channel switched off, skipping");
                        continue;
                    }
                    match self.email.send_notification(notification).await {
                        Ok(()) => delivery.mark_sent(),
                        Err(error) => {
                            warn!(
                                notification_id = %notification.id,
                                %user_id,
                                error,
                                "email delivery failed, recorded for retry"
                            );
                            delivery.mark_failed(error);
                        }
                    }
                }
                NotificationChannel::Push => continue,
            }

            self.deliveries.insert(&delivery).await?;
            created.push(delivery);
        }
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitepulse_core::config::RealtimeConfig;
    use sitepulse_core::types::{ProjectId, UserId};
    use sitepulse_database::memory::{InMemoryDeliveryStore, InMemoryPreferenceStore};
    use sitepulse_entity::notification::taxonomy::{self, names};
    use sitepulse_entity::{
        BoundedContext, DeliveryStatus, NotificationContent, NotificationPreference,
        NotificationPriority, UserRole,
    };
    use sitepulse_facade::{InMemoryContext, UserProfile, UserSettings};

    use crate::email::renderer::EmailRenderer;
    use crate::email::transport::MemoryEmailTransport;

    struct Fixture {
        dispatcher: DeliveryDispatcher,
        deliveries: Arc<InMemoryDeliveryStore>,
        preferences: Arc<InMemoryPreferenceStore>,
        transport: Arc<MemoryEmailTransport>,
        gateway: Arc<RealtimeGateway>,
        user: UserProfile,
    }

    fn fixture_with(settings: Option<UserSettings>) -> Fixture {
        let user = UserProfile {
            id: UserId::new(),
            name: "Rosa Medina".to_string(),
            email: "rosa@example.com".to_string(),
            role: UserRole::Manager,
            active: true,
        };
        let mut ctx = InMemoryContext::new();
        ctx.add_user(user.clone());
        if let Some(settings) = settings {
            ctx.set_settings(user.id, settings);
        }
        let ctx = Arc::new(ctx);

        let deliveries = Arc::new(InMemoryDeliveryStore::new());
        let preferences = Arc::new(InMemoryPreferenceStore::new());
        let transport = Arc::new(MemoryEmailTransport::new());
        let gateway = Arc::new(RealtimeGateway::new(RealtimeConfig::default()));
        let email = Arc::new(EmailChannel::new(
            ctx.clone(),
            ctx.clone(),
            ctx,
            EmailRenderer::new("https://sitepulse.example"),
            transport.clone(),
        ));
        let dispatcher = DeliveryDispatcher::new(
            deliveries.clone(),
            preferences.clone(),
            gateway.clone(),
            email,
        );
        Fixture {
            dispatcher,
            deliveries,
            preferences,
            transport,
            gateway,
            user,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(None)
    }

    fn low_stock_notification(user_id: UserId) -> (Notification, &'static NotificationType) {
        let entry = taxonomy::resolve(names::LOW_STOCK, UserRole::Manager).unwrap();
        let n = Notification::for_project(
            ProjectId::new(),
            entry,
            BoundedContext::Materials,
            NotificationPriority::Normal,
            NotificationContent::new("Stock low", "Cement below minimum").unwrap(),
        )
        .materialize_for(user_id);
        (n, entry)
    }

    fn status_of(rows: &[NotificationDelivery], channel: NotificationChannel) -> DeliveryStatus {
        rows.iter().find(|d| d.channel == channel).unwrap().status
    }

    #[tokio::test]
    async fn test_all_active_channels_get_a_delivery_row() {
        let f = fixture();
        let (n, entry) = low_stock_notification(f.user.id);

        let rows = f.dispatcher.dispatch(&n, entry).await.unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(status_of(&rows, NotificationChannel::InApp), DeliveryStatus::Sent);
        assert_eq!(status_of(&rows, NotificationChannel::WebSocket), DeliveryStatus::Sent);
        assert_eq!(status_of(&rows, NotificationChannel::Email), DeliveryStatus::Sent);
        assert_eq!(f.transport.sent().await.len(), 1);
        assert_eq!(f.deliveries.find_by_notification(n.id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_email_failure_is_recorded_not_thrown() {
        let f = fixture();
        f.transport.fail_with("smtp: connection refused").await;
        let (n, entry) = low_stock_notification(f.user.id);

        let rows = f.dispatcher.dispatch(&n, entry).await.unwrap();
        let email = rows
            .iter()
            .find(|d| d.channel == NotificationChannel::Email)
            .unwrap();
        assert_eq!(email.status, DeliveryStatus::Failed);
        assert_eq!(email.attempt_count, 1);
        assert!(email.last_error.as_deref().unwrap().contains("connection refused"));
        // The other channels were unaffected.
        assert_eq!(status_of(&rows, NotificationChannel::InApp), DeliveryStatus::Sent);
    }

    #[tokio::test]
    async fn test_channel_preference_suppresses_the_row_entirely() {
        let f = fixture();
        f.preferences
            .upsert(&NotificationPreference::new(
                f.user.id,
                BoundedContext::Materials,
                NotificationChannel::Email,
                false,
            ))
            .await
            .unwrap();
        let (n, entry) = low_stock_notification(f.user.id);

        let rows = f.dispatcher.dispatch(&n, entry).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|d| d.channel != NotificationChannel::Email));
        assert!(f.transport.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_non_disableable_type_ignores_channel_preference() {
        let f = fixture();
        f.preferences
            .upsert(&NotificationPreference::new(
                f.user.id,
                BoundedContext::Materials,
                NotificationChannel::Email,
                false,
            ))
            .await
            .unwrap();

        let entry = taxonomy::resolve(names::CRITICAL_STOCK, UserRole::Manager).unwrap();
        let n = Notification::for_project(
            ProjectId::new(),
            entry,
            BoundedContext::Materials,
            NotificationPriority::Critical,
            NotificationContent::new("Stock critical", "Cement nearly out").unwrap(),
        )
        .materialize_for(f.user.id);

        let rows = f.dispatcher.dispatch(&n, entry).await.unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(f.transport.sent().await.len(), 1);
    }

    #[tokio::test]
    async fn test_non_disableable_type_ignores_email_switch_in_settings() {
        let f = fixture_with(Some(UserSettings {
            email_enabled: false,
            ..UserSettings::default()
        }));

        let entry = taxonomy::resolve(names::CRITICAL_STOCK, UserRole::Manager).unwrap();
        let n = Notification::for_project(
            ProjectId::new(),
            entry,
            BoundedContext::Materials,
            NotificationPriority::Critical,
            NotificationContent::new("Stock critical", "Cement nearly out").unwrap(),
        )
        .materialize_for(f.user.id);

        let rows = f.dispatcher.dispatch(&n, entry).await.unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(status_of(&rows, NotificationChannel::Email), DeliveryStatus::Sent);
        assert_eq!(f.transport.sent().await.len(), 1);
    }

    #[tokio::test]
    async fn test_email_switch_in_settings_skips_email_channel() {
        let f = fixture_with(Some(UserSettings {
            email_enabled: false,
            ..UserSettings::default()
        }));
        let (n, entry) = low_stock_notification(f.user.id);

        let rows = f.dispatcher.dispatch(&n, entry).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(f.transport.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_online_recipient_receives_the_websocket_event() {
        let f = fixture();
        let (_, mut rx) = f.gateway.register(f.user.id);
        let (n, entry) = low_stock_notification(f.user.id);

        f.dispatcher.dispatch(&n, entry).await.unwrap();
        match rx.recv().await {
            Some(ServerEvent::NewNotification { id, is_read, .. }) => {
                assert_eq!(id, n.id);
                assert!(!is_read);
            }
            other => panic!("expected NewNotification, got {other:?}"),
        }
    }
}
