//! Re-attempts failed email deliveries.

use std::sync::Arc;

use tracing::{debug, info, warn};

use sitepulse_core::AppResult;
use sitepulse_database::{DeliveryStore, NotificationStore};

use crate::email::channel::EmailChannel;

/// Outcome of one retry pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RetrySummary {
    /// Deliveries this pass claimed.
    pub claimed: usize,
    /// Claimed deliveries that went out.
    pub succeeded: usize,
    /// Claimed deliveries that failed again.
    pub failed: usize,
}

/// Scans for retriable deliveries and re-attempts them.
///
/// Each candidate is claimed with a compare-and-swap on its attempt count,
/// so two overlapping passes never double-send the same delivery. Email is
/// the only retriable channel.
pub struct RetryManager {
    deliveries: Arc<dyn DeliveryStore>,
    notifications: Arc<dyn NotificationStore>,
    email: Arc<EmailChannel>,
    max_attempts: i32,
    batch_size: i64,
}

impl RetryManager {
    pub fn new(
        deliveries: Arc<dyn DeliveryStore>,
        notifications: Arc<dyn NotificationStore>,
        email: Arc<EmailChannel>,
        max_attempts: i32,
    ) -> Self {
        Self {
            deliveries,
            notifications,
            email,
            max_attempts,
            batch_size: 100,
        }
    }

    /// Run one retry pass over the current retriable backlog.
    pub async fn retry_failed_deliveries(&self) -> AppResult<RetrySummary> {
        let candidates = self
            .deliveries
            .find_retriable(self.max_attempts, self.batch_size)
            .await?;

        let mut summary = RetrySummary::default();
        for candidate in candidates {
            if !candidate.channel.is_retriable() {
                continue;
            }

            let Some(mut claimed) = self
                .deliveries
                .claim_for_retry(candidate.id, candidate.attempt_count)
                .await?
            else {
                // Another pass got there first.
                debug!(delivery_id = %candidate.id, "retry claim lost, skipping");
                continue;
            };
            summary.claimed += 1;

            let outcome = match self.notifications.find_by_id(claimed.notification_id).await? {
                Some(notification) => self.email.send_notification(&notification).await,
                None => Err("notification row missing for delivery".to_string()),
            };

            match &outcome {
                Ok(()) => summary.succeeded += 1,
                Err(error) => {
                    warn!(
                        delivery_id = %claimed.id,
                        attempt = claimed.attempt_count,
                        error,
                        "email retry failed"
                    );
                    summary.failed += 1;
                }
            }
            claimed.settle_retry(outcome);
            self.deliveries.update(&claimed).await?;
        }

        if summary.claimed > 0 {
            info!(
                claimed = summary.claimed,
                succeeded = summary.succeeded,
                failed = summary.failed,
                "retry pass finished"
            );
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitepulse_core::types::{ProjectId, UserId};
    use sitepulse_database::memory::{InMemoryDeliveryStore, InMemoryNotificationStore};
    use sitepulse_entity::notification::taxonomy::{self, names};
    use sitepulse_entity::{
        BoundedContext, DeliveryStatus, Notification, NotificationChannel, NotificationContent,
        NotificationDelivery, NotificationPriority, UserRole,
    };
    use sitepulse_facade::{InMemoryContext, UserProfile};

    use crate::email::renderer::EmailRenderer;
    use crate::email::transport::MemoryEmailTransport;

    struct Fixture {
        manager: RetryManager,
        deliveries: Arc<InMemoryDeliveryStore>,
        notifications: Arc<InMemoryNotificationStore>,
        transport: Arc<MemoryEmailTransport>,
        user: UserProfile,
    }

    fn fixture(max_attempts: i32) -> Fixture {
        let user = UserProfile {
            id: UserId::new(),
            name: "Rosa Medina".to_string(),
            email: "rosa@example.com".to_string(),
            role: UserRole::Manager,
            active: true,
        };
        let mut ctx = InMemoryContext::new();
        ctx.add_user(user.clone());
        let ctx = Arc::new(ctx);

        let deliveries = Arc::new(InMemoryDeliveryStore::new());
        let notifications = Arc::new(InMemoryNotificationStore::new());
        let transport = Arc::new(MemoryEmailTransport::new());
        let email = Arc::new(EmailChannel::new(
            ctx.clone(),
            ctx.clone(),
            ctx,
            EmailRenderer::new("https://sitepulse.example"),
            transport.clone(),
        ));
        let manager = RetryManager::new(
            deliveries.clone(),
            notifications.clone(),
            email,
            max_attempts,
        );
        Fixture {
            manager,
            deliveries,
            notifications,
            transport,
            user,
        }
    }

    async fn seed_failed_email(f: &Fixture) -> NotificationDelivery {
        let entry = taxonomy::resolve(names::LOW_STOCK, UserRole::Manager).unwrap();
        let notification = Notification::for_project(
            ProjectId::new(),
            entry,
            BoundedContext::Materials,
            NotificationPriority::Normal,
            NotificationContent::new("Stock low", "Cement below minimum").unwrap(),
        )
        .materialize_for(f.user.id);
        f.notifications.insert(&notification).await.unwrap();

        let mut delivery =
            NotificationDelivery::pending(notification.id, NotificationChannel::Email);
        delivery.mark_failed("smtp: connection refused");
        f.deliveries.insert(&delivery).await.unwrap();
        delivery
    }

    #[tokio::test]
    async fn test_failed_delivery_is_retried_and_sent() {
        let f = fixture(3);
        let delivery = seed_failed_email(&f).await;

        let summary = f.manager.retry_failed_deliveries().await.unwrap();
        assert_eq!(summary, RetrySummary { claimed: 1, succeeded: 1, failed: 0 });

        let rows = f
            .deliveries
            .find_by_notification(delivery.notification_id)
            .await
            .unwrap();
        assert_eq!(rows[0].status, DeliveryStatus::Sent);
        assert_eq!(rows[0].attempt_count, 2);
        assert!(rows[0].last_error.is_none());
        assert_eq!(f.transport.sent().await.len(), 1);
    }

    #[tokio::test]
    async fn test_attempt_cap_stops_retries() {
        let f = fixture(2);
        f.transport.fail_with("smtp: still down").await;
        let delivery = seed_failed_email(&f).await;

        // First pass: attempt 1 -> 2, fails again.
        let summary = f.manager.retry_failed_deliveries().await.unwrap();
        assert_eq!(summary.failed, 1);

        // Second pass: attempt_count reached the cap, nothing claimed.
        let summary = f.manager.retry_failed_deliveries().await.unwrap();
        assert_eq!(summary.claimed, 0);

        let rows = f
            .deliveries
            .find_by_notification(delivery.notification_id)
            .await
            .unwrap();
        assert_eq!(rows[0].status, DeliveryStatus::Failed);
        assert_eq!(rows[0].attempt_count, 2);
    }

    #[tokio::test]
    async fn test_missing_notification_settles_as_failed() {
        let f = fixture(3);
        let mut orphan = NotificationDelivery::pending(
            sitepulse_core::types::NotificationId::new(),
            NotificationChannel::Email,
        );
        orphan.mark_failed("smtp: connection refused");
        f.deliveries.insert(&orphan).await.unwrap();

        let summary = f.manager.retry_failed_deliveries().await.unwrap();
        assert_eq!(summary.failed, 1);
        let rows = f
            .deliveries
            .find_by_notification(orphan.notification_id)
            .await
            .unwrap();
        assert!(rows[0]
            .last_error
            .as_deref()
            .unwrap()
            .contains("missing"));
    }
}
