//! The realtime gateway.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, info};

use sitepulse_core::config::RealtimeConfig;
use sitepulse_core::types::UserId;

use crate::connection::{ConnectionHandle, ConnectionId};
use crate::group::GroupRegistry;
use crate::message::ServerEvent;

/// Registry of live connections plus group-addressed push.
///
/// Every connection automatically joins its user's `user:<uuid>` group, so
/// pushing to a user reaches all of their open tabs and devices. Pushing to
/// a user with no live connection delivers to nobody and is not an error.
#[derive(Debug)]
pub struct RealtimeGateway {
    config: RealtimeConfig,
    connections: DashMap<ConnectionId, ConnectionHandle>,
    registry: GroupRegistry,
    next_id: AtomicU64,
}

impl RealtimeGateway {
    pub fn new(config: RealtimeConfig) -> Self {
        Self {
            config,
            connections: DashMap::new(),
            registry: GroupRegistry::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// The per-user group name convention.
    pub fn user_group(user_id: UserId) -> String {
        format!("user:{user_id}")
    }

    /// Register a new connection for a user.
    ///
    /// Returns the connection id and the receiving half the socket writer
    /// task drains. When the user already holds the maximum number of
    /// connections, the oldest one is evicted first.
    pub fn register(&self, user_id: UserId) -> (ConnectionId, mpsc::Receiver<ServerEvent>) {
        self.evict_if_over_limit(user_id);

        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(self.config.channel_buffer_size);
        let handle = ConnectionHandle::new(id, user_id, tx);

        self.connections.insert(id, handle);
        self.registry.join(&Self::user_group(user_id), id);
        info!(connection_id = id.0, user_id = %user_id, "realtime connection registered");
        (id, rx)
    }

    /// Drop a connection and all of its group memberships.
    pub fn unregister(&self, id: ConnectionId) {
        if let Some((_, handle)) = self.connections.remove(&id) {
            self.registry.leave_all(id);
            debug!(connection_id = id.0, user_id = %handle.user_id, "realtime connection closed");
        }
    }

    /// Add a connection to a broadcast group. Idempotent.
    pub fn join_group(&self, id: ConnectionId, group: &str) {
        if self.connections.contains_key(&id) {
            self.registry.join(group, id);
        }
    }

    /// Remove a connection from a broadcast group. Idempotent.
    pub fn leave_group(&self, id: ConnectionId, group: &str) {
        self.registry.leave(group, id);
    }

    /// Push an event to every live connection of one user. Returns how many
    /// connections accepted it; zero means the user is offline.
    pub fn push_to_user(&self, user_id: UserId, event: &ServerEvent) -> usize {
        self.push_to_group(&Self::user_group(user_id), event)
    }

    /// Push an event to every live member of a group.
    pub fn push_to_group(&self, group: &str, event: &ServerEvent) -> usize {
        let mut delivered = 0;
        for id in self.registry.members(group) {
            let Some(handle) = self.connections.get(&id) else {
                continue;
            };
            if handle.try_send(event.clone()) {
                delivered += 1;
            } else if !handle.is_alive() {
                drop(handle);
                self.unregister(id);
            }
        }
        delivered
    }

    /// Whether the user has at least one live connection.
    pub fn is_online(&self, user_id: UserId) -> bool {
        self.registry
            .members(&Self::user_group(user_id))
            .iter()
            .any(|id| {
                self.connections
                    .get(id)
                    .map(|h| h.is_alive())
                    .unwrap_or(false)
            })
    }

    fn evict_if_over_limit(&self, user_id: UserId) {
        let group = Self::user_group(user_id);
        let mut existing: Vec<ConnectionHandle> = self
            .registry
            .members(&group)
            .into_iter()
            .filter_map(|id| self.connections.get(&id).map(|h| h.value().clone()))
            .collect();
        if existing.len() < self.config.max_connections_per_user {
            return;
        }

        existing.sort_by_key(|h| (h.connected_at, h.id));
        let surplus = existing.len() + 1 - self.config.max_connections_per_user;
        for handle in existing.into_iter().take(surplus) {
            info!(
                connection_id = handle.id.0,
                user_id = %user_id,
                "evicting oldest realtime connection, per-user limit reached"
            );
            self.unregister(handle.id);
        }
    }
}
