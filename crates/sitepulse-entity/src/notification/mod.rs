//! Notification domain entities.

pub mod channel;
pub mod content;
pub mod context;
pub mod delivery;
pub mod model;
pub mod preference;
pub mod priority;
pub mod scope;
pub mod taxonomy;

pub use channel::NotificationChannel;
pub use content::NotificationContent;
pub use context::BoundedContext;
pub use delivery::{DeliveryStatus, NotificationDelivery};
pub use model::Notification;
pub use preference::NotificationPreference;
pub use priority::NotificationPriority;
pub use scope::NotificationScope;
pub use taxonomy::{NotificationType, UnknownTypeError};
