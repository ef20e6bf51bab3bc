// src/pagination.rs

pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Totals derived from the item count and the current page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationSummary {
    pub total_items: u64,
    pub page_size: u32,
    pub total_pages: u64,
    pub has_more: bool,
}

impl PaginationSummary {
    pub fn new(total_items: u64, page: u32, page_size: u32) -> Self {
        let page_size = page_size.max(1);
        let total_pages = total_items.div_ceil(u64::from(page_size));

        Self {
            total_items,
            page_size,
            total_pages,
            has_more: u64::from(page) < total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_page_of_three() {
        let summary = PaginationSummary::new(45, 1, DEFAULT_PAGE_SIZE);
        assert_eq!(summary.total_pages, 3);
        assert!(summary.has_more);
    }

    #[test]
    fn test_last_page_has_no_more() {
        let summary = PaginationSummary::new(45, 3, DEFAULT_PAGE_SIZE);
        assert_eq!(summary.total_pages, 3);
        assert!(!summary.has_more);
    }

    #[test]
    fn test_total_pages_is_ceiling() {
        for total in [0u64, 1, 19, 20, 21, 40, 41, 1000] {
            let summary = PaginationSummary::new(total, 1, DEFAULT_PAGE_SIZE);
            let expected = (total + 19) / 20;
            assert_eq!(summary.total_pages, expected, "total = {}", total);
            assert_eq!(summary.has_more, 1 < expected, "total = {}", total);
        }
    }

    #[test]
    fn test_empty_result_has_no_pages() {
        let summary = PaginationSummary::new(0, 1, DEFAULT_PAGE_SIZE);
        assert_eq!(summary.total_pages, 0);
        assert!(!summary.has_more);
    }
}
