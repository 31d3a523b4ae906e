//! Pagination bar model.

use crate::api::types::CharacterPage;
use crate::state::url::{DEFAULT_PAGE, UrlPatch};

/// Pages shown before the bar collapses into gaps.
pub const MAX_VISIBLE_PAGES: u32 = 7;
/// Neighbors shown on each side of the current page.
pub const SIDE_PAGES: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSlot {
    Page(u32),
    Gap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationInfo {
    pub current_page: u32,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PaginationInfo {
    /// `total_pages` of zero is treated as a single page.
    #[must_use]
    pub fn new(current_page: u32, page: &CharacterPage) -> Self {
        Self {
            current_page: current_page.max(DEFAULT_PAGE),
            total_pages: page.total_pages.max(1),
            has_next: page.has_next,
            has_prev: page.has_prev,
        }
    }

    /// The bar is hidden for a single page.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.total_pages > 1
    }

    /// First and last page are always present; a window of `SIDE_PAGES`
    /// around the current page fills the middle, with gaps elsewhere.
    #[must_use]
    pub fn visible_pages(&self) -> Vec<PageSlot> {
        let total = self.total_pages;
        if total <= MAX_VISIBLE_PAGES {
            return (1..=total).map(PageSlot::Page).collect();
        }

        let current = self.current_page.min(total);
        let start = current.saturating_sub(SIDE_PAGES).max(2);
        let end = current.saturating_add(SIDE_PAGES).min(total - 1);

        let mut slots = vec![PageSlot::Page(1)];
        if start > 2 {
            slots.push(PageSlot::Gap);
        }
        slots.extend((start..=end).map(PageSlot::Page));
        if end < total - 1 {
            slots.push(PageSlot::Gap);
        }
        slots.push(PageSlot::Page(total));
        slots
    }

    // =========================================================================
    // NAVIGATION
    // =========================================================================

    #[must_use]
    pub fn first(&self) -> Option<UrlPatch> {
        self.has_prev.then(|| UrlPatch::goto_page(1))
    }

    #[must_use]
    pub fn prev(&self) -> Option<UrlPatch> {
        self.has_prev.then(|| UrlPatch::goto_page(self.current_page.saturating_sub(1).max(1)))
    }

    #[must_use]
    pub fn next(&self) -> Option<UrlPatch> {
        self.has_next.then(|| UrlPatch::goto_page(self.current_page.saturating_add(1)))
    }

    #[must_use]
    pub fn last(&self) -> Option<UrlPatch> {
        self.has_next.then(|| UrlPatch::goto_page(self.total_pages))
    }
}

#[cfg(test)]
#[path = "pagination_test.rs"]
mod tests;
