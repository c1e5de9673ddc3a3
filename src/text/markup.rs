use std::ops::Range;

use serde::Serialize;

use crate::annotations::{AnnotationId, AnnotationStore};
use crate::page::{BoundingBox, PageNumber};
use crate::search::{HighlightStyle, PageHighlight};

use super::PageText;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotationMark {
    pub id: AnnotationId,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FragmentHighlight {
    /// Byte range inside the fragment's own text.
    pub range: Range<usize>,
    pub style: HighlightStyle,
    pub match_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FragmentMarkup {
    pub text: String,
    pub bounds: BoundingBox,
    pub highlights: Vec<FragmentHighlight>,
    pub marks: Vec<AnnotationMark>,
}

/// Everything the host needs to draw one page's text overlay: fragment boxes,
/// search highlight spans and annotation marks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageTextLayer {
    pub page: PageNumber,
    pub fragments: Vec<FragmentMarkup>,
}

impl PageTextLayer {
    pub fn build(
        page: PageNumber,
        text: &PageText,
        highlights: &[PageHighlight],
        annotations: &AnnotationStore,
    ) -> Self {
        let fragments = text
            .fragments()
            .iter()
            .enumerate()
            .map(|(index, span)| {
                let fragment_text = text.fragment_text(index).unwrap_or_default();
                let highlights = highlights
                    .iter()
                    .filter_map(|highlight| clip(highlight, &span.range))
                    .collect();
                let marks = annotations
                    .marks_for_fragment(page, fragment_text)
                    .map(|annotation| AnnotationMark {
                        id: annotation.id,
                        color: annotation.color.clone(),
                    })
                    .collect();
                FragmentMarkup {
                    text: fragment_text.to_string(),
                    bounds: span.bounds,
                    highlights,
                    marks,
                }
            })
            .collect();
        Self { page, fragments }
    }

    pub fn highlight_count(&self, style: HighlightStyle) -> usize {
        self.fragments
            .iter()
            .flat_map(|fragment| &fragment.highlights)
            .filter(|highlight| highlight.style == style)
            .count()
    }
}

fn clip(highlight: &PageHighlight, fragment: &Range<usize>) -> Option<FragmentHighlight> {
    let start = highlight.range.start.max(fragment.start);
    let end = highlight.range.end.min(fragment.end);
    (start < end).then(|| FragmentHighlight {
        range: start - fragment.start..end - fragment.start,
        style: highlight.style,
        match_index: highlight.match_index,
    })
}
