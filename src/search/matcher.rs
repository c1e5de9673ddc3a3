use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMatcherKind {
    #[default]
    ContainsInsensitive,
    ContainsSensitive,
}

impl SearchMatcherKind {
    pub fn from_match_case(match_case: bool) -> Self {
        if match_case {
            Self::ContainsSensitive
        } else {
            Self::ContainsInsensitive
        }
    }

    /// Non-overlapping occurrences of `query` in `text`, left to right, as
    /// byte ranges into `text`.
    pub fn find_all(self, text: &str, query: &str) -> Vec<Range<usize>> {
        if query.is_empty() {
            return Vec::new();
        }
        match self {
            Self::ContainsSensitive => text
                .match_indices(query)
                .map(|(start, found)| start..start + found.len())
                .collect(),
            Self::ContainsInsensitive => find_folded(text, query),
        }
    }
}

/// One lowercase char of the folded text and the original char it came from.
struct FoldedChar {
    ch: char,
    source: Range<usize>,
    /// First char of its source's lowercase expansion.
    starts_source: bool,
    /// Last char of its source's lowercase expansion.
    ends_source: bool,
}

fn fold(text: &str) -> Vec<FoldedChar> {
    let mut folded = Vec::with_capacity(text.len());
    for (start, original) in text.char_indices() {
        let source = start..start + original.len_utf8();
        let lower: Vec<char> = original.to_lowercase().collect();
        let last = lower.len().saturating_sub(1);
        for (position, ch) in lower.into_iter().enumerate() {
            folded.push(FoldedChar {
                ch,
                source: source.clone(),
                starts_source: position == 0,
                ends_source: position == last,
            });
        }
    }
    folded
}

// Matching happens on lowercase chars, but ranges are reported in the
// original text; a match must start and end on whole original chars.
fn find_folded(text: &str, query: &str) -> Vec<Range<usize>> {
    let haystack = fold(text);
    let needle: Vec<char> = query.chars().flat_map(char::to_lowercase).collect();
    if needle.is_empty() || needle.len() > haystack.len() {
        return Vec::new();
    }

    let mut found = Vec::new();
    let mut at = 0;
    while at + needle.len() <= haystack.len() {
        let window = &haystack[at..at + needle.len()];
        let first = &window[0];
        let last = &window[window.len() - 1];
        let matched = first.starts_source
            && last.ends_source
            && window.iter().zip(&needle).all(|(folded, ch)| folded.ch == *ch);
        if matched {
            found.push(first.source.start..last.source.end);
            at += needle.len();
        } else {
            at += 1;
        }
    }
    found
}
