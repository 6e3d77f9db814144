//! Page windows over the snap list.
//!
//! Positions are 1-based over the store's key order. A `PageRange` is the
//! requested span; a `PageWindow` is that span plus whether there is
//! anything before or after it.

use serde::Serialize;

use ms_core::constants::PAGE_SIZE;

const PAGE: usize = PAGE_SIZE as usize;

/// Requested span of positions, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRange {
    pub start: usize,
    pub end: usize,
}

impl PageRange {
    /// Normalise so that `1 <= start <= end`.
    pub fn new(start: usize, end: usize) -> Self {
        let start = start.max(1);
        Self {
            start,
            end: end.max(start),
        }
    }

    /// The first page.
    pub fn first() -> Self {
        Self::new(1, PAGE)
    }

    /// The page-sized range beginning at `start`.
    pub fn starting_at(start: usize) -> Self {
        let start = start.max(1);
        Self::new(start, start.saturating_add(PAGE - 1))
    }

    /// The page-aligned range holding `position`.
    pub fn containing(position: usize) -> Self {
        let position = position.max(1);
        Self::starting_at((position - 1) / PAGE * PAGE + 1)
    }

    /// The page after one ending at `current_end`.
    pub fn page_down(current_end: usize) -> Self {
        Self::new(current_end.saturating_add(1), current_end.saturating_add(PAGE))
    }

    /// The page before one starting at `current_start`, or `None` when
    /// already at the top.
    pub fn page_up(current_start: usize) -> Option<Self> {
        if current_start <= 1 {
            return None;
        }
        Some(Self::new(
            current_start.saturating_sub(PAGE).max(1),
            current_start - 1,
        ))
    }

    pub fn contains(&self, position: usize) -> bool {
        (self.start..=self.end).contains(&position)
    }
}

impl Default for PageRange {
    fn default() -> Self {
        Self::first()
    }
}

/// A rendered span with its navigation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageWindow {
    pub start: usize,
    pub end: usize,
    pub has_prev: bool,
    pub has_next: bool,
}

impl PageWindow {
    pub fn compute(start: usize, end: usize, total_seen: usize) -> Self {
        let range = PageRange::new(start, end);
        Self {
            start: range.start,
            end: range.end,
            has_prev: range.start > 1,
            has_next: range.end < total_seen,
        }
    }

    pub fn range(&self) -> PageRange {
        PageRange::new(self.start, self.end)
    }

    /// Range to show after paging down, if there is more.
    pub fn next(&self) -> Option<PageRange> {
        self.has_next.then(|| PageRange::page_down(self.end))
    }

    /// Range to show after paging up, if there is anything before.
    pub fn prev(&self) -> Option<PageRange> {
        PageRange::page_up(self.start)
    }
}
