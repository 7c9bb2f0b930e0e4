//! Application layer managing state and business workflows.
//!
//! This module coordinates between the domain layer and presentation layer:
//! the permission-checked catalog workflows, the terminal application state,
//! and command line configuration.

pub mod config;
pub mod state;
pub mod workflow;

pub use config::*;
pub use state::*;
pub use workflow::*;
