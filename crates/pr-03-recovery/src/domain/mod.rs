//! # Domain Module
//!
//! Phase outcomes and errors.

pub mod errors;
pub mod value_objects;

pub use errors::{RecoveryError, StorePayloadError};
pub use value_objects::{RecoveryReport, RecoveryResult};
