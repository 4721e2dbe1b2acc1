//! # sitepulse-realtime
//!
//! Realtime gateway: keeps track of live WebSocket connections, groups them
//! by user id (and arbitrary broadcast groups), and pushes server events to
//! them. Delivery is best effort; a recipient with no live connection is
//! simply skipped.

pub mod connection;
pub mod gateway;
pub mod group;
pub mod message;
pub mod server;

pub use connection::{ConnectionHandle, ConnectionId};
pub use gateway::RealtimeGateway;
pub use group::GroupRegistry;
pub use message::{ClientMessage, ServerEvent};
