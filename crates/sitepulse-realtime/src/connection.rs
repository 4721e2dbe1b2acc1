//! Live connection bookkeeping.

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::warn;

use sitepulse_core::types::UserId;

use crate::message::ServerEvent;

/// Identifier of one live WebSocket connection. A user may hold several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

/// Server-side handle to one connection: the sending half of the channel
/// drained by the socket writer task.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    pub id: ConnectionId,
    pub user_id: UserId,
    pub connected_at: DateTime<Utc>,
    sender: mpsc::Sender<ServerEvent>,
}

impl ConnectionHandle {
    pub fn new(id: ConnectionId, user_id: UserId, sender: mpsc::Sender<ServerEvent>) -> Self {
        Self {
            id,
            user_id,
            connected_at: Utc::now(),
            sender,
        }
    }

    /// Queue an event for this connection without blocking.
    ///
    /// A full buffer means the client is not draining its socket; the event
    /// is dropped with a warning rather than stalling the dispatcher.
    pub fn try_send(&self, event: ServerEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(
                    connection_id = self.id.0,
                    user_id = %self.user_id,
                    "realtime send buffer full, dropping event"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Whether the socket writer side is still attached.
    pub fn is_alive(&self) -> bool {
        !self.sender.is_closed()
    }
}
