//! # sitepulse-database
//!
//! Persistence boundary of the notification engine: the store traits, their
//! PostgreSQL implementations, an in-memory implementation used by unit
//! tests and local development, plus connection pooling and migrations.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod stores;

pub use stores::{DeliveryStore, NotificationStore, PreferenceStore};
