//! PostgreSQL store implementations.

pub mod delivery;
pub mod notification;
pub mod preference;

pub use delivery::PgDeliveryStore;
pub use notification::PgNotificationStore;
pub use preference::PgPreferenceStore;
