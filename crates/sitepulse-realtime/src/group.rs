//! Group membership registry.

use std::collections::HashSet;

use dashmap::DashMap;

use crate::connection::ConnectionId;

/// Connection membership per named group.
///
/// Groups are arbitrary strings; the gateway maintains the convention of a
/// `user:<uuid>` group per connected user, and clients may join broader
/// broadcast groups. Join and leave are idempotent.
#[derive(Debug, Default)]
pub struct GroupRegistry {
    groups: DashMap<String, HashSet<ConnectionId>>,
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to a group. Joining twice is a no-op.
    pub fn join(&self, group: &str, connection: ConnectionId) {
        self.groups
            .entry(group.to_string())
            .or_default()
            .insert(connection);
    }

    /// Remove a connection from a group. Leaving a group the connection is
    /// not in is a no-op. Empty groups are dropped.
    pub fn leave(&self, group: &str, connection: ConnectionId) {
        if let Some(mut members) = self.groups.get_mut(group) {
            members.remove(&connection);
            if members.is_empty() {
                drop(members);
                self.groups.remove_if(group, |_, m| m.is_empty());
            }
        }
    }

    /// Remove a connection from every group it joined.
    pub fn leave_all(&self, connection: ConnectionId) {
        for mut entry in self.groups.iter_mut() {
            entry.value_mut().remove(&connection);
        }
        self.groups.retain(|_, members| !members.is_empty());
    }

    /// Current members of a group.
    pub fn members(&self, group: &str) -> Vec<ConnectionId> {
        self.groups
            .get(group)
            .map(|m| m.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Whether the group has at least one member.
    pub fn is_populated(&self, group: &str) -> bool {
        self.groups.get(group).map(|m| !m.is_empty()).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_is_idempotent() {
        let registry = GroupRegistry::new();
        let conn = ConnectionId(1);
        registry.join("site:7", conn);
        registry.join("site:7", conn);
        assert_eq!(registry.members("site:7"), vec![conn]);
    }

    #[test]
    fn test_leave_unknown_group_is_a_noop() {
        let registry = GroupRegistry::new();
        registry.leave("nowhere", ConnectionId(1));
        assert!(!registry.is_populated("nowhere"));
    }

    #[test]
    fn test_leave_all_clears_every_membership() {
        let registry = GroupRegistry::new();
        let conn = ConnectionId(1);
        registry.join("a", conn);
        registry.join("b", conn);
        registry.join("b", ConnectionId(2));

        registry.leave_all(conn);
        assert!(!registry.is_populated("a"));
        assert_eq!(registry.members("b"), vec![ConnectionId(2)]);
    }
}
