//! Paginated result sets.

use serde::{Deserialize, Serialize};

/// One page of results, mirroring the catalog API's pagination metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-indexed page number.
    pub page: u32,
    pub total_pages: u32,
    /// Total matching items across all pages.
    pub total: u64,
}

/// An entry in a rendered pagination bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSlot {
    Number(u32),
    Gap,
}

impl<T> Page<T> {
    /// An empty first page.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            items: Vec::new(),
            page: 1,
            total_pages: 0,
            total: 0,
        }
    }

    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    #[must_use]
    pub const fn has_prev(&self) -> bool {
        self.page > 1
    }

    /// Page numbers to link around the current page.
    ///
    /// Always includes the first and last page and every page within `radius`
    /// of the current one. Runs of skipped pages collapse into a single
    /// [`PageSlot::Gap`]. Returns an empty list when there is one page or none.
    #[must_use]
    pub fn window(&self, radius: u32) -> Vec<PageSlot> {
        if self.total_pages <= 1 {
            return Vec::new();
        }

        let current = self.page.clamp(1, self.total_pages);
        let lo = current.saturating_sub(radius).max(1);
        let hi = current.saturating_add(radius).min(self.total_pages);

        let mut slots = Vec::new();
        let mut last = 0;
        let visible = (1..=self.total_pages)
            .filter(|&n| n == 1 || n == self.total_pages || (lo..=hi).contains(&n));
        for n in visible {
            if n > last + 1 {
                slots.push(PageSlot::Gap);
            }
            slots.push(PageSlot::Number(n));
            last = n;
        }
        slots
    }

    /// Transform the items while keeping the pagination metadata.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            total_pages: self.total_pages,
            total: self.total,
        }
    }
}
