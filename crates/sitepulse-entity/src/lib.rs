//! # sitepulse-entity
//!
//! Domain entities for the SitePulse notification engine: the notification
//! aggregate and its embedded content value object, the per-channel delivery
//! record with its status state machine, the static notification taxonomy,
//! user roles, and per-user delivery preferences.

pub mod notification;
pub mod user;

pub use notification::{
    BoundedContext, DeliveryStatus, Notification, NotificationChannel, NotificationContent,
    NotificationDelivery, NotificationPreference, NotificationPriority, NotificationScope,
    NotificationType, UnknownTypeError,
};
pub use user::UserRole;
