//! # Algorithms Module
//!
//! Pure payload merge and paging helpers.

pub mod merge;
pub mod paging;

pub use merge::{combine_affected, merge};
pub use paging::calculate_batch_count;
