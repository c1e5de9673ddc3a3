use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::EngineResult;
use crate::page::{BoundingBox, PageNumber, RasterSize};
use crate::view::Rotation;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Arc<[u8]>,
}

impl RgbaFrame {
    pub fn byte_len(&self) -> usize {
        self.pixels.len()
    }

    pub fn size(&self) -> RasterSize {
        RasterSize::new(self.width, self.height)
    }
}

/// Positioned run of page text. Bounds are in unrotated page points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFragment {
    pub text: String,
    pub bounds: BoundingBox,
}

impl TextFragment {
    pub fn new(text: impl Into<String>, bounds: BoundingBox) -> Self {
        Self {
            text: text.into(),
            bounds,
        }
    }
}

/// The page decoder the engine drives. Rendering and text extraction are
/// treated as opaque.
pub trait PageDecoder: Send {
    fn page_count(&self) -> usize;
    /// Unrotated page size in points at scale 1.0.
    fn page_dimensions(&self, page: PageNumber) -> EngineResult<(f32, f32)>;
    fn render_page(
        &self,
        page: PageNumber,
        scale: f32,
        rotation: Rotation,
    ) -> EngineResult<RgbaFrame>;
    fn text_fragments(&self, page: PageNumber) -> EngineResult<Vec<TextFragment>>;
}

/// Opens decoders from raw document bytes. Used both for the interactive
/// session and for the background text extraction worker.
pub trait DocumentLoader: Send + Sync {
    fn load(&self, bytes: Arc<Vec<u8>>) -> EngineResult<Box<dyn PageDecoder>>;
}
