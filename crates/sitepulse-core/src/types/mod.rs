//! Core type definitions used across the SitePulse workspace.

pub mod id;

pub use id::*;
