//! Infrastructure layer providing storage and file integrations.
//!
//! This module contains the shared transactional store, JSON snapshot
//! persistence and CSV export.

pub mod store;
pub mod persistence;
pub mod export;

pub use store::*;
pub use persistence::*;
pub use export::*;
