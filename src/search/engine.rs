use std::collections::BTreeSet;
use std::ops::Range;

use log::debug;
use serde::Serialize;

use crate::page::PageNumber;
use crate::text::TextIndex;

use super::SearchMatcherKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchMatch {
    pub page: PageNumber,
    /// Byte offsets into the page's extracted text.
    pub start_index: usize,
    pub end_index: usize,
    pub text: String,
    /// Position in the global page-then-offset ordering.
    pub match_index: usize,
}

impl SearchMatch {
    pub fn range(&self) -> Range<usize> {
        self.start_index..self.end_index
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HighlightStyle {
    Current,
    Dimmed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageHighlight {
    pub match_index: usize,
    pub range: Range<usize>,
    pub style: HighlightStyle,
}

/// Cross-page search over whatever text has been indexed so far.
///
/// Results are recomputed in full whenever the query or the case flag
/// changes, and again when new page text arrives while a query is active.
#[derive(Debug, Default)]
pub struct SearchEngine {
    query: String,
    matcher: SearchMatcherKind,
    highlight_all: bool,
    matches: Vec<SearchMatch>,
    current: usize,
    indexed_revision: u64,
}

impl SearchEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `query` over every indexed page. An empty query clears the
    /// results. Returns the match that became current.
    pub fn search(
        &mut self,
        index: &TextIndex,
        query: &str,
        match_case: bool,
        highlight_all: bool,
    ) -> Option<&SearchMatch> {
        self.query = query.trim().to_string();
        self.matcher = SearchMatcherKind::from_match_case(match_case);
        self.highlight_all = highlight_all;
        self.current = 0;
        if self.query.is_empty() {
            self.matches.clear();
            return None;
        }
        self.recompute(index);
        debug!(
            "query {:?} matched {} spans across {} indexed pages",
            self.query,
            self.matches.len(),
            index.len()
        );
        self.matches.first()
    }

    /// Re-runs the active query if the index grew since the last run. The
    /// current match index is clamped, never moved forward.
    pub fn refresh(&mut self, index: &TextIndex) -> bool {
        if !self.is_active() || index.revision() == self.indexed_revision {
            return false;
        }
        self.recompute(index);
        self.current = self.current.min(self.matches.len().saturating_sub(1));
        true
    }

    pub fn clear(&mut self) {
        self.query.clear();
        self.matches.clear();
        self.current = 0;
    }

    pub fn is_active(&self) -> bool {
        !self.query.is_empty()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn matches(&self) -> &[SearchMatch] {
        &self.matches
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_match(&self) -> Option<&SearchMatch> {
        self.matches.get(self.current)
    }

    /// Moves to the next match. Returns `None` at the last match.
    pub fn go_to_next_match(&mut self) -> Option<&SearchMatch> {
        if self.current + 1 >= self.matches.len() {
            return None;
        }
        self.current += 1;
        self.matches.get(self.current)
    }

    /// Moves to the previous match. Returns `None` at the first match.
    pub fn go_to_previous_match(&mut self) -> Option<&SearchMatch> {
        if self.current == 0 || self.matches.is_empty() {
            return None;
        }
        self.current -= 1;
        self.matches.get(self.current)
    }

    /// Pages that hold at least one match.
    pub fn match_pages(&self) -> BTreeSet<PageNumber> {
        self.matches.iter().map(|found| found.page).collect()
    }

    /// Spans to paint on `page`. With highlight-all every match is shown and
    /// the current one is emphasized; otherwise only the current one is.
    pub fn highlights_for_page(&self, page: PageNumber) -> Vec<PageHighlight> {
        self.matches
            .iter()
            .filter(|found| found.page == page)
            .filter_map(|found| {
                let style = if found.match_index == self.current {
                    HighlightStyle::Current
                } else if self.highlight_all {
                    HighlightStyle::Dimmed
                } else {
                    return None;
                };
                Some(PageHighlight {
                    match_index: found.match_index,
                    range: found.range(),
                    style,
                })
            })
            .collect()
    }

    fn recompute(&mut self, index: &TextIndex) {
        self.indexed_revision = index.revision();
        self.matches.clear();
        for (page, page_text) in index.pages() {
            let text = page_text.text();
            for range in self.matcher.find_all(text, &self.query) {
                let match_index = self.matches.len();
                self.matches.push(SearchMatch {
                    page,
                    start_index: range.start,
                    end_index: range.end,
                    text: text[range].to_string(),
                    match_index,
                });
            }
        }
    }
}
