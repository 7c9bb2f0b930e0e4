pub mod models;
pub mod catalog;
pub mod validation;
pub mod reports;
pub mod errors;

pub use models::*;
pub use catalog::*;
pub use validation::*;
pub use reports::*;
pub use errors::*;
