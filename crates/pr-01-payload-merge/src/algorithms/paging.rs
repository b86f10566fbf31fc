//! # Paging
//!
//! Page count calculation shared by every paged store walk.

/// Number of pages of `page_size` needed to cover `total` rows.
///
/// A zero page size yields zero pages.
pub fn calculate_batch_count(page_size: u64, total: u64) -> u64 {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(page_size)
}
