mod store;

use serde::{Deserialize, Serialize};

pub use store::AnnotationStore;

use crate::page::{BoundingBox, PageNumber};

pub type AnnotationId = uuid::Uuid;

pub const DEFAULT_NOTE_COLOR: &str = "#ffeb3b";

/// A highlight with a note, anchored to selected text.
///
/// `position` is the selection box in viewport coordinates at creation time.
/// It is never re-projected when the view transform changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: AnnotationId,
    pub text: String,
    pub page: PageNumber,
    pub note: String,
    pub color: String,
    pub position: BoundingBox,
}

/// The host's current text selection.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextSelection {
    pub text: String,
    /// Page the selection started on, if it is inside a page at all.
    pub page: Option<PageNumber>,
    pub bounds: BoundingBox,
}

impl TextSelection {
    pub fn new(text: impl Into<String>, page: Option<PageNumber>, bounds: BoundingBox) -> Self {
        Self {
            text: text.into(),
            page,
            bounds,
        }
    }
}
