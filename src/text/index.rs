use std::collections::BTreeMap;
use std::ops::Range;

use crate::backend::TextFragment;
use crate::page::{BoundingBox, PageNumber};

const FRAGMENT_SEPARATOR: &str = " ";

#[derive(Debug, Clone, PartialEq)]
pub struct FragmentSpan {
    /// Byte range of the fragment inside the page text.
    pub range: Range<usize>,
    pub bounds: BoundingBox,
}

/// A page's searchable text: fragments joined by single spaces, with the
/// byte range each fragment occupies.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageText {
    text: String,
    fragments: Vec<FragmentSpan>,
}

impl PageText {
    pub fn from_fragments(fragments: &[TextFragment]) -> Self {
        let mut text = String::new();
        let mut spans = Vec::with_capacity(fragments.len());
        for fragment in fragments.iter().filter(|fragment| !fragment.text.is_empty()) {
            if !text.is_empty() {
                text.push_str(FRAGMENT_SEPARATOR);
            }
            let start = text.len();
            text.push_str(&fragment.text);
            spans.push(FragmentSpan {
                range: start..text.len(),
                bounds: fragment.bounds,
            });
        }
        Self {
            text,
            fragments: spans,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn fragments(&self) -> &[FragmentSpan] {
        &self.fragments
    }

    pub fn fragment_text(&self, index: usize) -> Option<&str> {
        let span = self.fragments.get(index)?;
        self.text.get(span.range.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Indices of fragments overlapping `range`.
    pub fn fragments_overlapping(&self, range: &Range<usize>) -> impl Iterator<Item = usize> + '_ {
        let range = range.clone();
        self.fragments
            .iter()
            .enumerate()
            .filter(move |(_, span)| span.range.start < range.end && range.start < span.range.end)
            .map(|(index, _)| index)
    }
}

/// Extracted text of every page seen so far, keyed by page.
#[derive(Debug, Clone, Default)]
pub struct TextIndex {
    pages: BTreeMap<PageNumber, PageText>,
    revision: u64,
}

impl TextIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a page's text. A page is only ever indexed once.
    pub fn insert(&mut self, page: PageNumber, text: PageText) -> bool {
        if self.pages.contains_key(&page) {
            return false;
        }
        self.pages.insert(page, text);
        self.revision = self.revision.saturating_add(1);
        true
    }

    pub fn get(&self, page: PageNumber) -> Option<&PageText> {
        self.pages.get(&page)
    }

    pub fn contains(&self, page: PageNumber) -> bool {
        self.pages.contains_key(&page)
    }

    /// Indexed pages in ascending page order.
    pub fn pages(&self) -> impl Iterator<Item = (PageNumber, &PageText)> {
        self.pages.iter().map(|(page, text)| (*page, text))
    }

    /// Bumped on every insert so readers can tell the index grew.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}
