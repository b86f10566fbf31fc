//! # Algorithms Module

pub mod aggregation;

pub use aggregation::{aggregate, group_by_hash};
