//! # sitepulse-engine
//!
//! The notification engine proper: resolves recipients for a notification
//! (targeting), validates and creates notifications (command service), fans
//! deliveries out per channel (dispatcher), re-attempts failed email
//! deliveries (retry manager), and renders the email templates.

pub mod command;
pub mod dispatch;
pub mod email;
pub mod retry;
pub mod targeting;

pub use command::{NotificationCommandService, NotificationDraft};
pub use dispatch::DeliveryDispatcher;
pub use email::channel::EmailChannel;
pub use email::renderer::{EmailRenderer, RenderedEmail};
pub use email::transport::{
    EmailTransport, MemoryEmailTransport, NoopEmailTransport, OutboundEmail, SmtpEmailTransport,
};
pub use retry::{RetryManager, RetrySummary};
pub use targeting::TargetingResolver;
