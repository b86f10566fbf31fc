//! # Application Module
//!
//! Application services orchestrating the merge algorithm and the stores.

pub mod dataset_merger;

pub use dataset_merger::DatasetMerger;
