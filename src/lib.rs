//! TCATALOG - Terminal Product Catalog Library
//!
//! Categories, tags and products with their technical details, managed from
//! the terminal. Product and detail are validated together and written in one
//! transaction; deleting a category cascades to its products.

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
pub use application::*;
