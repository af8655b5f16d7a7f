//! Workflow launching.
//!
//! This module owns the catalogue of runnable scripts and the registry of the
//! ones currently running. The HTTP layer writes through it; the status view
//! only reads the registry keys.

mod supervisor;
mod workflow;

pub use supervisor::Supervisor;
pub use workflow::Workflow;
