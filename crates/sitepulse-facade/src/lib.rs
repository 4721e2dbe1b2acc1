//! # sitepulse-facade
//!
//! Read-only anti-corruption facades over the other bounded contexts
//! (Projects, Users, Personnel, Materials, Machinery, Incidents,
//! Configuration). The engine only ever reads these contexts through the
//! traits here; it never touches their storage or domain logic directly.
//!
//! Error contract: "not found" is a value (`None`, empty, zero), never an
//! error. Infrastructure failures surface as [`ContextUnavailable`], which
//! call sites log and treat as "unknown/absent" so that an outage in one
//! context cannot block a business operation in another.

pub mod error;
pub mod incident;
pub mod machinery;
pub mod material;
pub mod memory;
pub mod personnel;
pub mod project;
pub mod settings;
pub mod user;

pub use error::{ContextResult, ContextUnavailable};
pub use incident::{IncidentFacade, PgIncidentFacade};
pub use machinery::{MachineryFacade, PgMachineryFacade};
pub use material::{MaterialFacade, MaterialStock, PgMaterialFacade};
pub use memory::InMemoryContext;
pub use personnel::{PersonnelFacade, PgPersonnelFacade};
pub use project::{PgProjectFacade, ProjectFacade, ProjectSummary};
pub use settings::{PgSettingsFacade, SettingsFacade, UserSettings};
pub use user::{PgUserFacade, UserFacade, UserProfile};
