use log::debug;

use crate::error::{EngineError, EngineResult};
use crate::page::PageNumber;

use super::{Annotation, AnnotationId, DEFAULT_NOTE_COLOR, TextSelection};

/// Annotations in creation order.
#[derive(Debug, Clone, Default)]
pub struct AnnotationStore {
    annotations: Vec<Annotation>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a note for `selection`. The selection needs non-blank text and a
    /// page; otherwise nothing is stored.
    pub fn add_note(&mut self, selection: &TextSelection, note: &str) -> Option<AnnotationId> {
        self.add_note_with_color(selection, note, DEFAULT_NOTE_COLOR)
    }

    pub fn add_note_with_color(
        &mut self,
        selection: &TextSelection,
        note: &str,
        color: &str,
    ) -> Option<AnnotationId> {
        let text = selection.text.trim();
        if text.is_empty() {
            debug!("ignoring note without selected text");
            return None;
        }
        let Some(page) = selection.page else {
            debug!("ignoring note for a selection outside any page");
            return None;
        };

        let id = AnnotationId::new_v4();
        self.annotations.push(Annotation {
            id,
            text: text.to_string(),
            page,
            note: note.to_string(),
            color: color.to_string(),
            position: selection.bounds,
        });
        Some(id)
    }

    /// Re-inserts a previously created annotation, keeping its id. Returns
    /// false if an annotation with that id already exists.
    pub fn restore(&mut self, annotation: Annotation) -> bool {
        if self.get(annotation.id).is_some() {
            return false;
        }
        self.annotations.push(annotation);
        true
    }

    pub fn remove(&mut self, id: AnnotationId) -> Option<Annotation> {
        let index = self.annotations.iter().position(|annotation| annotation.id == id)?;
        Some(self.annotations.remove(index))
    }

    pub fn clear_all(&mut self) -> usize {
        let removed = self.annotations.len();
        self.annotations.clear();
        removed
    }

    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.annotations.iter().find(|annotation| annotation.id == id)
    }

    pub fn all(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn for_page(&self, page: PageNumber) -> impl Iterator<Item = &Annotation> {
        self.annotations
            .iter()
            .filter(move |annotation| annotation.page == page)
    }

    /// Annotations on `page` whose text occurs anywhere in `fragment_text`.
    ///
    /// This is a plain substring test, so a short annotation can mark every
    /// fragment on the page that happens to contain the same words.
    pub fn marks_for_fragment<'a>(
        &'a self,
        page: PageNumber,
        fragment_text: &'a str,
    ) -> impl Iterator<Item = &'a Annotation> + 'a {
        self.for_page(page)
            .filter(move |annotation| fragment_text.contains(annotation.text.as_str()))
    }

    pub fn ids_at_fragment(&self, page: PageNumber, fragment_text: &str) -> Vec<AnnotationId> {
        self.marks_for_fragment(page, fragment_text)
            .map(|annotation| annotation.id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    pub fn to_json(&self) -> EngineResult<String> {
        serde_json::to_string_pretty(&self.annotations).map_err(|err| {
            EngineError::invalid_argument(format!("failed to serialize annotations: {err}"))
        })
    }

    /// Parses annotations previously written by `to_json`. Entries with blank
    /// text are dropped.
    pub fn from_json(raw: &str) -> EngineResult<Self> {
        let annotations: Vec<Annotation> = serde_json::from_str(raw).map_err(|err| {
            EngineError::invalid_argument(format!("failed to parse annotations: {err}"))
        })?;
        Ok(Self {
            annotations: annotations
                .into_iter()
                .filter(|annotation| !annotation.text.trim().is_empty())
                .collect(),
        })
    }
}
