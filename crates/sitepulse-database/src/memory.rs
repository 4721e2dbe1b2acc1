//! In-memory store implementations.
//!
//! Back the engine in unit tests and in development mode without a
//! PostgreSQL instance. Semantics mirror the SQL repositories, including
//! the compare-and-swap retry claim.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use sitepulse_core::types::{DeliveryId, NotificationId, UserId};
use sitepulse_core::AppResult;
use sitepulse_entity::{
    BoundedContext, DeliveryStatus, Notification, NotificationChannel, NotificationDelivery,
    NotificationPreference,
};

use crate::stores::{DeliveryStore, NotificationStore, PreferenceStore};

/// In-memory [`NotificationStore`].
#[derive(Debug, Default)]
pub struct InMemoryNotificationStore {
    rows: RwLock<HashMap<NotificationId, Notification>>,
}

impl InMemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationStore for InMemoryNotificationStore {
    async fn insert(&self, notification: &Notification) -> AppResult<()> {
        self.rows
            .write()
            .await
            .insert(notification.id, notification.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: NotificationId) -> AppResult<Option<Notification>> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn mark_read(
        &self,
        id: NotificationId,
        user_id: UserId,
        read_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(&id) {
            Some(n) if n.target_user_id == Some(user_id) && !n.is_read => {
                n.is_read = true;
                n.read_at = Some(read_at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_all_read(&self, user_id: UserId, read_at: DateTime<Utc>) -> AppResult<u64> {
        let mut rows = self.rows.write().await;
        let mut changed = 0;
        for n in rows.values_mut() {
            if n.target_user_id == Some(user_id) && !n.is_read {
                n.is_read = true;
                n.read_at = Some(read_at);
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn unread_count(&self, user_id: UserId) -> AppResult<i64> {
        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .filter(|n| n.target_user_id == Some(user_id) && !n.is_read)
            .count() as i64)
    }

    async fn find_recent_for_user(
        &self,
        user_id: UserId,
        limit: i64,
    ) -> AppResult<Vec<Notification>> {
        let rows = self.rows.read().await;
        let mut result: Vec<Notification> = rows
            .values()
            .filter(|n| n.target_user_id == Some(user_id))
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        result.truncate(limit as usize);
        Ok(result)
    }

    async fn find_since_for_user(
        &self,
        user_id: UserId,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<Notification>> {
        let rows = self.rows.read().await;
        let mut result: Vec<Notification> = rows
            .values()
            .filter(|n| n.target_user_id == Some(user_id) && n.created_at >= since)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }

    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|_, n| !(n.is_read && n.created_at < cutoff));
        Ok((before - rows.len()) as u64)
    }
}

/// In-memory [`DeliveryStore`].
#[derive(Debug, Default)]
pub struct InMemoryDeliveryStore {
    rows: RwLock<HashMap<DeliveryId, NotificationDelivery>>,
}

impl InMemoryDeliveryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeliveryStore for InMemoryDeliveryStore {
    async fn insert(&self, delivery: &NotificationDelivery) -> AppResult<()> {
        self.rows
            .write()
            .await
            .insert(delivery.id, delivery.clone());
        Ok(())
    }

    async fn update(&self, delivery: &NotificationDelivery) -> AppResult<()> {
        self.rows
            .write()
            .await
            .insert(delivery.id, delivery.clone());
        Ok(())
    }

    async fn find_by_notification(
        &self,
        id: NotificationId,
    ) -> AppResult<Vec<NotificationDelivery>> {
        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .filter(|d| d.notification_id == id)
            .cloned()
            .collect())
    }

    async fn find_retriable(
        &self,
        max_attempts: i32,
        limit: i64,
    ) -> AppResult<Vec<NotificationDelivery>> {
        let rows = self.rows.read().await;
        let mut result: Vec<NotificationDelivery> = rows
            .values()
            .filter(|d| d.status.can_retry() && d.attempt_count < max_attempts)
            .cloned()
            .collect();
        result.sort_by(|a, b| a.last_attempt_at.cmp(&b.last_attempt_at));
        result.truncate(limit as usize);
        Ok(result)
    }

    async fn claim_for_retry(
        &self,
        id: DeliveryId,
        expected_attempts: i32,
    ) -> AppResult<Option<NotificationDelivery>> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(&id) {
            Some(d) if d.status.can_retry() && d.attempt_count == expected_attempts => {
                d.status = DeliveryStatus::Retrying;
                d.attempt_count += 1;
                d.last_attempt_at = Some(Utc::now());
                Ok(Some(d.clone()))
            }
            _ => Ok(None),
        }
    }
}

#[derive(Debug, Default)]
struct PreferenceRows {
    rows: HashMap<(UserId, BoundedContext, NotificationChannel), NotificationPreference>,
}

/// In-memory [`PreferenceStore`].
#[derive(Debug, Default)]
pub struct InMemoryPreferenceStore {
    inner: RwLock<PreferenceRows>,
}

impl InMemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PreferenceStore for InMemoryPreferenceStore {
    async fn is_enabled(
        &self,
        user_id: UserId,
        context: BoundedContext,
        channel: NotificationChannel,
    ) -> AppResult<bool> {
        let inner = self.inner.read().await;
        Ok(inner
            .rows
            .get(&(user_id, context, channel))
            .map(|p| p.enabled)
            .unwrap_or(true))
    }

    async fn upsert(&self, preference: &NotificationPreference) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        inner.rows.insert(
            (preference.user_id, preference.context, preference.channel),
            preference.clone(),
        );
        Ok(())
    }

    async fn find_for_user(&self, user_id: UserId) -> AppResult<Vec<NotificationPreference>> {
        let inner = self.inner.read().await;
        Ok(inner
            .rows
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitepulse_entity::notification::taxonomy::{self, names};
    use sitepulse_entity::user::UserRole;
    use sitepulse_entity::{NotificationContent, NotificationPriority};

    fn sample_notification(user_id: UserId) -> Notification {
        let entry = taxonomy::resolve(names::USER_CREATED, UserRole::Admin).unwrap();
        let content = NotificationContent::new("Title", "Message").unwrap();
        Notification::for_user(
            user_id,
            entry,
            BoundedContext::System,
            NotificationPriority::Normal,
            content,
        )
    }

    #[tokio::test]
    async fn test_mark_read_is_idempotent() {
        let store = InMemoryNotificationStore::new();
        let user = UserId::new();
        let n = sample_notification(user);
        store.insert(&n).await.unwrap();

        assert!(store.mark_read(n.id, user, Utc::now()).await.unwrap());
        assert!(!store.mark_read(n.id, user, Utc::now()).await.unwrap());
        assert_eq!(store.unread_count(user).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mark_read_rejects_other_user() {
        let store = InMemoryNotificationStore::new();
        let user = UserId::new();
        let n = sample_notification(user);
        store.insert(&n).await.unwrap();

        assert!(!store.mark_read(n.id, UserId::new(), Utc::now()).await.unwrap());
        assert_eq!(store.unread_count(user).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_purge_keeps_unread_rows() {
        let store = InMemoryNotificationStore::new();
        let user = UserId::new();
        let read = sample_notification(user);
        let unread = sample_notification(user);
        store.insert(&read).await.unwrap();
        store.insert(&unread).await.unwrap();
        store.mark_read(read.id, user, Utc::now()).await.unwrap();

        let purged = store
            .purge_older_than(Utc::now() + chrono::Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(purged, 1);
        assert!(store.find_by_id(unread.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_claim_for_retry_is_a_compare_and_swap() {
        let store = InMemoryDeliveryStore::new();
        let mut d = NotificationDelivery::pending(NotificationId::new(), NotificationChannel::Email);
        d.mark_failed("smtp timeout");
        store.insert(&d).await.unwrap();

        let claimed = store.claim_for_retry(d.id, 1).await.unwrap().unwrap();
        assert_eq!(claimed.status, DeliveryStatus::Retrying);
        assert_eq!(claimed.attempt_count, 2);

        // A second pass holding the stale attempt count loses the race.
        assert!(store.claim_for_retry(d.id, 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_claim_ignores_sent_deliveries() {
        let store = InMemoryDeliveryStore::new();
        let mut d = NotificationDelivery::pending(NotificationId::new(), NotificationChannel::Email);
        d.mark_sent();
        store.insert(&d).await.unwrap();

        assert!(store.claim_for_retry(d.id, 1).await.unwrap().is_none());
        assert!(store.find_retriable(3, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_preferences_default_to_enabled() {
        let store = InMemoryPreferenceStore::new();
        let user = UserId::new();
        assert!(store
            .is_enabled(user, BoundedContext::Materials, NotificationChannel::Email)
            .await
            .unwrap());

        let pref = NotificationPreference::new(
            user,
            BoundedContext::Materials,
            NotificationChannel::Email,
            false,
        );
        store.upsert(&pref).await.unwrap();
        assert!(!store
            .is_enabled(user, BoundedContext::Materials, NotificationChannel::Email)
            .await
            .unwrap());
        assert_eq!(store.find_for_user(user).await.unwrap().len(), 1);
    }
}
