//! # Domain Module
//!
//! Errors and value objects for dataset consolidation.

pub mod errors;
pub mod value_objects;

pub use errors::MigrationError;
pub use value_objects::MigrationSummary;
