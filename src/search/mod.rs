mod engine;
mod matcher;

pub use engine::{HighlightStyle, PageHighlight, SearchEngine, SearchMatch};
pub use matcher::SearchMatcherKind;
