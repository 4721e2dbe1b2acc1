//! # sitepulse-worker
//!
//! The background scheduler: a cancellable periodic runner driving the
//! engine checks (proactive project/stock/machinery/incident/attendance
//! sweeps, the retry pass and the daily digest pass).

pub mod checks;
pub mod runner;

#[cfg(test)]
pub(crate) mod testutil;

pub use checks::EngineCheck;
pub use runner::EngineRunner;
