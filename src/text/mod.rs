mod extract;
mod index;
mod markup;

pub use extract::{ExtractionEvent, TextExtractor};
pub use index::{FragmentSpan, PageText, TextIndex};
pub use markup::{AnnotationMark, FragmentHighlight, FragmentMarkup, PageTextLayer};
