use std::collections::BTreeMap;

use log::debug;

use crate::page::PageNumber;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageState {
    pub rendered: bool,
    pub thumbnail_rendered: bool,
    /// Extracted text, set once after the page first renders. An empty string
    /// means the page has no text layer.
    pub text: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextLayerStatus {
    Stored,
    /// Stored, but the page yielded no text.
    Missing,
    AlreadyExtracted,
    OutOfRange,
}

/// Lifecycle state for every page that has ever been materialized.
///
/// States are created lazily when a page first enters the window. Pages that
/// leave the window keep their state (and text) but are no longer rendered.
#[derive(Debug, Clone)]
pub struct PageRegistry {
    page_count: usize,
    states: BTreeMap<PageNumber, PageState>,
}

impl PageRegistry {
    pub fn new(page_count: usize) -> Self {
        Self {
            page_count,
            states: BTreeMap::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn contains_page(&self, page: PageNumber) -> bool {
        page.index() < self.page_count
    }

    pub fn state(&self, page: PageNumber) -> Option<&PageState> {
        self.states.get(&page)
    }

    pub fn is_rendered(&self, page: PageNumber) -> bool {
        self.state(page).is_some_and(|state| state.rendered)
    }

    pub fn text(&self, page: PageNumber) -> Option<&str> {
        self.state(page).and_then(|state| state.text.as_deref())
    }

    pub fn has_text(&self, page: PageNumber) -> bool {
        self.state(page).is_some_and(|state| state.text.is_some())
    }

    /// Pages that have been materialized at least once, ascending.
    pub fn known_pages(&self) -> impl Iterator<Item = PageNumber> + '_ {
        self.states.keys().copied()
    }

    pub fn mark_rendered(&mut self, page: PageNumber) -> bool {
        let Some(state) = self.ensure(page) else {
            return false;
        };
        state.rendered = true;
        true
    }

    pub fn mark_thumbnail_rendered(&mut self, page: PageNumber) -> bool {
        let Some(state) = self.ensure(page) else {
            return false;
        };
        state.thumbnail_rendered = true;
        true
    }

    /// Stores a page's text. Text is only ever set once per page.
    pub fn store_text(&mut self, page: PageNumber, text: String) -> TextLayerStatus {
        let Some(state) = self.ensure(page) else {
            return TextLayerStatus::OutOfRange;
        };
        if state.text.is_some() {
            return TextLayerStatus::AlreadyExtracted;
        }
        let missing = text.trim().is_empty();
        state.text = Some(text);
        if missing {
            TextLayerStatus::Missing
        } else {
            TextLayerStatus::Stored
        }
    }

    /// Marks every page unrendered, e.g. after a scale or rotation change.
    /// Text is kept.
    pub fn invalidate_rasters(&mut self) {
        for state in self.states.values_mut() {
            state.rendered = false;
        }
    }

    /// Current page plus `buffer` pages on each side, together with
    /// `match_pages`, clamped to the document, deduplicated and ascending.
    pub fn materialization_window(
        &self,
        current: PageNumber,
        buffer: u32,
        match_pages: impl IntoIterator<Item = PageNumber>,
    ) -> Vec<PageNumber> {
        let Some(last) = PageNumber::clamped(i64::MAX, self.page_count) else {
            return Vec::new();
        };
        let current = current.min(last);
        let first = current.saturating_sub(buffer);
        let end = current.saturating_add(buffer).min(last);

        let mut window: Vec<PageNumber> = (first.get()..=end.get())
            .filter_map(PageNumber::new)
            .chain(match_pages.into_iter().filter(|page| *page <= last))
            .collect();
        window.sort_unstable();
        window.dedup();
        window
    }

    /// Brings the registry in line with `window`: creates states for new
    /// pages and marks pages outside it unrendered. Returns pages that need a
    /// render.
    pub fn apply_window(&mut self, window: &[PageNumber]) -> Vec<PageNumber> {
        for (page, state) in self.states.iter_mut() {
            if state.rendered && window.binary_search(page).is_err() {
                debug!("page {page} left the window");
                state.rendered = false;
            }
        }
        window
            .iter()
            .copied()
            .filter(|page| self.ensure(*page).is_some_and(|state| !state.rendered))
            .collect()
    }

    fn ensure(&mut self, page: PageNumber) -> Option<&mut PageState> {
        if !self.contains_page(page) {
            debug!("page {page} is outside 1..={}", self.page_count);
            return None;
        }
        Some(self.states.entry(page).or_default())
    }
}
