use super::error::FilterError;
use super::types::{PageResult, PageWindow};

/// Parses the raw `page` query parameter into a zero-based page index.
pub fn parse_page(raw: Option<&str>) -> Result<Option<u64>, FilterError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s
            .parse::<u64>()
            .map(Some)
            .map_err(|_| FilterError::InvalidPage(format!("'{}' is not a non-negative integer", s))),
    }
}

/// Total pages for `total` rows; zero rows means zero pages.
pub fn total_pages(total: u64, page_size: u64) -> u64 {
    let page_size = page_size.max(1);
    total / page_size + u64::from(total % page_size != 0)
}

/// Maps a page request onto a row window.
///
/// Pages past the end are not rejected; they select an empty slice.
pub fn paginate(page: Option<u64>, total: u64, page_size: u64) -> PageResult {
    let page_size = page_size.max(1);
    let window = match page {
        None => PageWindow::All,
        Some(index) => PageWindow::Slice {
            offset: index.saturating_mul(page_size),
            limit: page_size,
        },
    };
    PageResult {
        window,
        total_pages: total_pages(total, page_size),
    }
}
