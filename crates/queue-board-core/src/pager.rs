//! Page cursor over the view.

use serde::{Deserialize, Serialize};

/// Reference rows per page.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Page position summary for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    /// 1-based current page
    pub current: usize,
    /// Total pages, at least 1
    pub total: usize,
    /// Whether a previous page exists
    pub can_prev: bool,
    /// Whether a next page exists
    pub can_next: bool,
}

/// Page cursor. `offset` is always the first index of a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pager {
    offset: usize,
    page_size: usize,
}

impl Pager {
    /// Cursor on the first page. A zero page size is treated as 1.
    pub fn new(page_size: usize) -> Self {
        Self {
            offset: 0,
            page_size: page_size.max(1),
        }
    }

    /// Rows per page.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// First index of the current page.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Index range of the current page.
    pub fn rows(&self) -> std::ops::Range<usize> {
        self.offset..self.offset.saturating_add(self.page_size)
    }

    fn last_page_start(&self, last: Option<usize>) -> usize {
        last.map_or(0, |last| (last / self.page_size) * self.page_size)
    }

    /// Pull the cursor back so it never sits past the page holding `last`.
    pub fn clamp(&mut self, last: Option<usize>) {
        self.offset = self.offset.min(self.last_page_start(last));
    }

    /// 1-based current page.
    pub fn current_page(&self) -> usize {
        self.offset / self.page_size + 1
    }

    /// Total pages for a view whose last used index is `last`.
    pub fn total_pages(&self, last: Option<usize>) -> usize {
        last.map_or(1, |last| last / self.page_size + 1)
    }

    /// Step back one page, stopping at the first.
    pub fn prev(&mut self) {
        self.offset = self.offset.saturating_sub(self.page_size);
    }

    /// Step forward one page, stopping at the last. No-op on an empty view.
    pub fn next(&mut self, last: Option<usize>) {
        if last.is_none() {
            return;
        }
        let next_page = (self.current_page() + 1).min(self.total_pages(last));
        self.offset = (next_page - 1) * self.page_size;
    }

    /// Jump to the page holding `last`.
    pub fn jump_to_last(&mut self, last: Option<usize>) {
        self.offset = self.last_page_start(last);
    }

    /// Summary for rendering.
    pub fn info(&self, last: Option<usize>) -> PageInfo {
        let total = self.total_pages(last);
        let current = self.current_page().min(total);
        PageInfo {
            current,
            total,
            can_prev: current > 1,
            can_next: current < total,
        }
    }
}
