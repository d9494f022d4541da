//! This module defines the common functionality for paging data.

/// The config that controls how pages of data are sized.
#[derive(Debug, Clone)]
pub struct PaginationConfig {
    /// The page number to default to when not specified in a request.
    pub default_page: u64,
    /// The number of transactions per page.
    pub page_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page: 1,
            page_size: 20,
        }
    }
}

/// A 1-based page of results, clamped to the available data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// The 1-based page number.
    pub number: u64,
    /// The number of rows per page.
    pub size: u64,
}

impl Page {
    /// Create a page for `requested`, clamping into `[1, page_count]` so that
    /// a request past the end lands on the last page instead of erroring.
    pub fn clamped(requested: u64, total_rows: u64, size: u64) -> Self {
        let number = requested.clamp(1, page_count(total_rows, size));

        Self { number, size }
    }

    /// The row offset of the first row on this page.
    pub fn offset(&self) -> u64 {
        (self.number - 1) * self.size
    }
}

/// The number of pages needed for `total_rows`, at least 1 so that an empty
/// result set still has a valid page to land on.
pub fn page_count(total_rows: u64, page_size: u64) -> u64 {
    total_rows.div_ceil(page_size).max(1)
}
