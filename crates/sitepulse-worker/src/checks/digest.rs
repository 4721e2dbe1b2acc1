//! Daily digest emails and read-notification retention.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use chrono_tz::Tz;
use tokio::sync::Mutex;
use tracing::{info, warn};

use sitepulse_core::config::DigestConfig;
use sitepulse_core::types::UserId;
use sitepulse_core::AppResult;
use sitepulse_database::NotificationStore;
use sitepulse_engine::EmailChannel;
use sitepulse_entity::UserRole;
use sitepulse_facade::{SettingsFacade, UserFacade, UserSettings};

use super::{DailyGate, EngineCheck};

/// Sends each admin and manager a daily email digest of the last 24
/// hours once their local digest hour has passed, then purges read
/// notifications past the retention window.
///
/// Sent days are tracked per user so repeated engine cycles on the same
/// local day do not produce duplicate digests. A failed send is not
/// recorded and is retried on the next cycle.
pub struct DigestCheck {
    notifications: Arc<dyn NotificationStore>,
    users: Arc<dyn UserFacade>,
    settings: Arc<dyn SettingsFacade>,
    email: Arc<EmailChannel>,
    digest: DigestConfig,
    retention_days: i64,
    sent_days: Mutex<HashMap<UserId, i32>>,
    purge_gate: DailyGate,
}

impl DigestCheck {
    pub fn new(
        notifications: Arc<dyn NotificationStore>,
        users: Arc<dyn UserFacade>,
        settings: Arc<dyn SettingsFacade>,
        email: Arc<EmailChannel>,
        digest: DigestConfig,
        retention_days: i64,
    ) -> Self {
        Self {
            notifications,
            users,
            settings,
            email,
            digest,
            retention_days,
            sent_days: Mutex::new(HashMap::new()),
            purge_gate: DailyGate::new(),
        }
    }

    async fn recipients(&self) -> Vec<sitepulse_facade::UserProfile> {
        let mut recipients = Vec::new();
        for role in [UserRole::Admin, UserRole::Manager] {
            match self.users.find_active_by_role(role).await {
                Ok(users) => recipients.extend(users),
                Err(error) => {
                    warn!(%error, ?role, "users context unavailable, skipping role in digest");
                }
            }
        }
        let mut seen = HashSet::new();
        recipients.retain(|u| seen.insert(u.id));
        recipients
    }

    async fn pass(&self, now: DateTime<Utc>) -> AppResult<()> {
        for user in self.recipients().await {
            let settings = match self.settings.settings_for(user.id).await {
                Ok(settings) => settings,
                Err(error) => {
                    warn!(%error, user_id = %user.id, "configuration context unavailable");
                    UserSettings {
                        digest_hour: self.digest.hour as i32,
                        ..UserSettings::default()
                    }
                }
            };
            if !settings.notifications_enabled || !settings.email_enabled {
                continue;
            }

            let tz: Tz = settings.timezone.parse().unwrap_or(chrono_tz::UTC);
            let local = now.with_timezone(&tz);
            if (local.hour() as i32) < settings.digest_hour {
                continue;
            }
            let day = local.num_days_from_ce();
            if self.sent_days.lock().await.get(&user.id) == Some(&day) {
                continue;
            }

            let items = match self
                .notifications
                .find_since_for_user(user.id, now - Duration::hours(24))
                .await
            {
                Ok(items) => items,
                Err(error) => {
                    warn!(%error, user_id = %user.id, "digest query failed");
                    continue;
                }
            };
            if items.is_empty() {
                // Nothing to report. Mark the day so we do not re-query
                // every cycle until midnight.
                self.sent_days.lock().await.insert(user.id, day);
                continue;
            }

            match self
                .email
                .send_digest(&user, &items, self.digest.max_items)
                .await
            {
                Ok(()) => {
                    info!(user_id = %user.id, items = items.len(), "digest sent");
                    self.sent_days.lock().await.insert(user.id, day);
                }
                Err(error) => {
                    warn!(%error, user_id = %user.id, "digest send failed, will retry next cycle");
                }
            }
        }

        if self.purge_gate.try_claim(now) {
            let cutoff = now - Duration::days(self.retention_days);
            match self.notifications.purge_older_than(cutoff).await {
                Ok(0) => {}
                Ok(purged) => info!(purged, "purged read notifications past retention"),
                Err(error) => warn!(%error, "retention purge failed"),
            }
        }
        Ok(())
    }
}

#[async_trait]
impl EngineCheck for DigestCheck {
    fn name(&self) -> &'static str {
        "daily_digest"
    }

    async fn run(&self) -> AppResult<()> {
        self.pass(Utc::now()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sitepulse_entity::notification::taxonomy::{self, names};
    use sitepulse_entity::{BoundedContext, Notification, NotificationContent, NotificationPriority};
    use sitepulse_facade::InMemoryContext;

    use crate::testutil::{engine_fixture, profile, EngineFixture};

    fn digest_check(f: &EngineFixture) -> DigestCheck {
        DigestCheck::new(
            f.notifications.clone(),
            f.ctx.clone(),
            f.ctx.clone(),
            f.email.clone(),
            DigestConfig::default(),
            90,
        )
    }

    fn inbox_item(user_id: UserId, title: &str) -> Notification {
        let entry = taxonomy::resolve(names::LOW_STOCK, UserRole::Manager).unwrap();
        let content = NotificationContent::new(title, "stock is running low").unwrap();
        Notification::for_user(
            user_id,
            entry,
            BoundedContext::Materials,
            NotificationPriority::Normal,
            content,
        )
    }

    fn evening() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 20, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_digest_sent_once_per_day_and_capped() {
        let manager = profile(UserRole::Manager);
        let mut ctx = InMemoryContext::new();
        ctx.add_user(manager.clone());
        let f = engine_fixture(ctx);
        for i in 0..12 {
            f.notifications
                .insert(&inbox_item(manager.id, &format!("Item {i}")))
                .await
                .unwrap();
        }

        let check = digest_check(&f);
        check.pass(evening()).await.unwrap();
        check.pass(evening()).await.unwrap();

        let sent = f.transport.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to_address, manager.email);
        assert!(sent[0].subject.contains("12 notifications"));
        // Default cap is 10, the remainder is summarized.
        assert!(sent[0].html_body.contains("+2 more"));
    }

    #[tokio::test]
    async fn test_empty_inbox_sends_no_digest() {
        let manager = profile(UserRole::Manager);
        let mut ctx = InMemoryContext::new();
        ctx.add_user(manager.clone());
        let f = engine_fixture(ctx);

        digest_check(&f).pass(evening()).await.unwrap();

        assert!(f.transport.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_email_disabled_suppresses_digest() {
        let manager = profile(UserRole::Manager);
        let mut ctx = InMemoryContext::new();
        ctx.add_user(manager.clone());
        ctx.set_settings(
            manager.id,
            UserSettings {
                email_enabled: false,
                ..UserSettings::default()
            },
        );
        let f = engine_fixture(ctx);
        f.notifications
            .insert(&inbox_item(manager.id, "Ignored"))
            .await
            .unwrap();

        digest_check(&f).pass(evening()).await.unwrap();

        assert!(f.transport.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_before_digest_hour_waits() {
        let manager = profile(UserRole::Manager);
        let mut ctx = InMemoryContext::new();
        ctx.add_user(manager.clone());
        let f = engine_fixture(ctx);
        f.notifications
            .insert(&inbox_item(manager.id, "Early bird"))
            .await
            .unwrap();

        let check = digest_check(&f);
        // 05:00 UTC is before the default 07:00 digest hour.
        let early = Utc.with_ymd_and_hms(2026, 3, 2, 5, 0, 0).unwrap();
        check.pass(early).await.unwrap();
        assert!(f.transport.sent().await.is_empty());

        check.pass(evening()).await.unwrap();
        assert_eq!(f.transport.sent().await.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_send_is_retried_next_cycle() {
        let manager = profile(UserRole::Manager);
        let mut ctx = InMemoryContext::new();
        ctx.add_user(manager.clone());
        let f = engine_fixture(ctx);
        f.notifications
            .insert(&inbox_item(manager.id, "Flaky"))
            .await
            .unwrap();

        let check = digest_check(&f);
        f.transport.fail_with("smtp down").await;
        check.pass(evening()).await.unwrap();
        assert!(f.transport.sent().await.is_empty());

        f.transport.recover().await;
        check.pass(evening()).await.unwrap();
        assert_eq!(f.transport.sent().await.len(), 1);
    }

    #[tokio::test]
    async fn test_purges_read_notifications_past_retention() {
        let manager = profile(UserRole::Manager);
        let mut ctx = InMemoryContext::new();
        ctx.add_user(manager.clone());
        let f = engine_fixture(ctx);

        let mut stale = inbox_item(manager.id, "Old news");
        stale.is_read = true;
        stale.created_at = evening() - Duration::days(120);
        f.notifications.insert(&stale).await.unwrap();
        let fresh = inbox_item(manager.id, "Fresh");
        f.notifications.insert(&fresh).await.unwrap();

        digest_check(&f).pass(evening()).await.unwrap();

        assert!(f
            .notifications
            .find_by_id(stale.id)
            .await
            .unwrap()
            .is_none());
        assert!(f
            .notifications
            .find_by_id(fresh.id)
            .await
            .unwrap()
            .is_some());
    }
}
