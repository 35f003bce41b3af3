//! Pagination helpers

use crate::results::NormalizedResult;

/// Fixed page size of report listings
pub const REPORT_PAGE_SIZE: u64 = 20;

/// One page of results with 1-indexed record bounds
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    /// 0 when the page is empty
    pub start_record: u64,
    /// 0 when the page is empty
    pub end_record: u64,
    pub results: Vec<NormalizedResult>,
}

/// Slice `results` to at most `per_page` entries and compute record bounds.
///
/// `offset` is the zero-based index of `results[0]` in the full result set.
pub fn paginate(mut results: Vec<NormalizedResult>, total: u64, offset: u64, per_page: u32) -> Page {
    results.truncate(per_page as usize);

    if total == 0 || results.is_empty() {
        return Page {
            results,
            ..Default::default()
        };
    }

    let start_record = offset + 1;
    Page {
        start_record,
        end_record: start_record + results.len() as u64 - 1,
        results,
    }
}

/// Number of report pages for `total` rows
pub fn total_pages(total: u64) -> u64 {
    total.div_ceil(REPORT_PAGE_SIZE)
}

/// Zero-based offset of the first result on `page` (pages start at 1)
pub fn offset_for(page: u32, per_page: u32) -> u64 {
    u64::from(page.saturating_sub(1)) * u64::from(per_page)
}
