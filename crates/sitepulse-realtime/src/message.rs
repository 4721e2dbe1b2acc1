//! Wire messages exchanged over the WebSocket endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sitepulse_core::types::NotificationId;
use sitepulse_entity::{BoundedContext, Notification, NotificationPriority};

/// Events pushed from the server to connected clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// A notification was created for the receiving user.
    NewNotification {
        id: NotificationId,
        notification_type: String,
        context: BoundedContext,
        priority: NotificationPriority,
        title: String,
        message: String,
        action_url: Option<String>,
        action_text: Option<String>,
        icon_class: Option<String>,
        created_at: DateTime<Utc>,
        is_read: bool,
    },
    /// The receiving user's unread counter changed.
    UnreadCountUpdate { count: i64 },
    /// A notification was acknowledged as read, possibly from another
    /// device of the same user.
    NotificationRead { notification_id: NotificationId },
    /// Reply to a client ping.
    Pong,
}

impl From<&Notification> for ServerEvent {
    fn from(n: &Notification) -> Self {
        ServerEvent::NewNotification {
            id: n.id,
            notification_type: n.type_name.clone(),
            context: n.context,
            priority: n.priority,
            title: n.content.title.clone(),
            message: n.content.message.clone(),
            action_url: n.content.action_url.clone(),
            action_text: n.content.action_text.clone(),
            icon_class: n.content.icon_class.clone(),
            created_at: n.created_at,
            is_read: n.is_read,
        }
    }
}

/// Messages a client may send after connecting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Join a broadcast group.
    JoinGroup { group: String },
    /// Leave a broadcast group.
    LeaveGroup { group: String },
    Ping,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_event_wire_format() {
        let event = ServerEvent::UnreadCountUpdate { count: 3 };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"type":"unread_count_update","count":3}"#);
    }

    #[test]
    fn test_client_message_parses() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"join_group","group":"project:site-7"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::JoinGroup {
                group: "project:site-7".to_string()
            }
        );
    }
}
