use std::sync::Arc;

use hayro::hayro_interpret::font::Glyph;
use hayro::hayro_interpret::util::{PageExt, RectExt};
use hayro::hayro_interpret::{
    BlendMode, ClipPath, Context, Device, GlyphDrawMode, Image, InterpreterSettings, Paint,
    PathDrawMode, SoftMask, interpret_page,
};
use hayro::hayro_syntax::Pdf;
use hayro::hayro_syntax::page::Page;
use hayro::vello_cpu::color::palette::css::WHITE;
use hayro::{RenderSettings, render};
use image::RgbaImage;
use image::imageops;
use kurbo::{Affine, BezPath, Point};

use crate::error::{EngineError, EngineResult};
use crate::page::{BoundingBox, PageNumber};
use crate::view::Rotation;

use super::traits::{DocumentLoader, PageDecoder, RgbaFrame, TextFragment};

const PDF_HEADER: &[u8] = b"%PDF-";
const LINE_BREAK_THRESHOLD: f64 = 6.0;
const FALLBACK_GLYPH_HEIGHT: f64 = 12.0;

#[derive(Debug, Default, Clone, Copy)]
pub struct HayroLoader;

impl DocumentLoader for HayroLoader {
    fn load(&self, bytes: Arc<Vec<u8>>) -> EngineResult<Box<dyn PageDecoder>> {
        PdfDoc::from_bytes(bytes).map(|doc| Box::new(doc) as Box<dyn PageDecoder>)
    }
}

pub struct PdfDoc {
    pdf: Pdf,
}

impl PageDecoder for PdfDoc {
    fn page_count(&self) -> usize {
        self.pdf.pages().len()
    }

    fn page_dimensions(&self, page: PageNumber) -> EngineResult<(f32, f32)> {
        Ok(self.page(page)?.render_dimensions())
    }

    fn render_page(
        &self,
        page: PageNumber,
        scale: f32,
        rotation: Rotation,
    ) -> EngineResult<RgbaFrame> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(EngineError::invalid_argument(
                "scale must be a positive finite value",
            ));
        }

        let page_ref = self.page(page)?;
        let render_settings = RenderSettings {
            x_scale: scale,
            y_scale: scale,
            bg_color: WHITE,
            ..Default::default()
        };
        let pixmap = render(page_ref, &InterpreterSettings::default(), &render_settings);
        let width = pixmap.width() as u32;
        let height = pixmap.height() as u32;
        let pixels = pixmap.data_as_u8_slice().to_vec();

        if rotation == Rotation::Deg0 {
            return Ok(RgbaFrame {
                width,
                height,
                pixels: pixels.into(),
            });
        }

        let upright = RgbaImage::from_raw(width, height, pixels).ok_or_else(|| {
            EngineError::page_render(
                page,
                EngineError::invalid_argument("pixmap length does not match dimensions"),
            )
        })?;
        let rotated = match rotation {
            Rotation::Deg0 => upright,
            Rotation::Deg90 => imageops::rotate90(&upright),
            Rotation::Deg180 => imageops::rotate180(&upright),
            Rotation::Deg270 => imageops::rotate270(&upright),
        };
        Ok(RgbaFrame {
            width: rotated.width(),
            height: rotated.height(),
            pixels: rotated.into_raw().into(),
        })
    }

    fn text_fragments(&self, page: PageNumber) -> EngineResult<Vec<TextFragment>> {
        let page_ref = self.page(page)?;
        let mut context = Context::new(
            page_ref.initial_transform(true),
            page_ref.intersected_crop_box().to_kurbo(),
            page_ref.xref(),
            InterpreterSettings::default(),
        );
        let mut device = FragmentDevice::default();
        interpret_page(page_ref, &mut context, &mut device);
        Ok(device.finish())
    }
}

impl PdfDoc {
    pub fn from_bytes(bytes: Arc<Vec<u8>>) -> EngineResult<Self> {
        if !bytes.as_slice().starts_with(PDF_HEADER) {
            return Err(EngineError::document_load("input is not a valid PDF header"));
        }
        let pdf = Pdf::new(bytes)
            .map_err(|_| EngineError::document_load("failed to parse PDF with hayro"))?;
        if pdf.pages().len() == 0 {
            return Err(EngineError::document_load("document has no pages"));
        }

        Ok(Self { pdf })
    }

    fn page(&self, page: PageNumber) -> EngineResult<&Page<'_>> {
        self.pdf
            .pages()
            .get(page.index())
            .ok_or_else(|| EngineError::invalid_argument("page index is out of range"))
    }
}

struct OpenFragment {
    text: String,
    min: Point,
    max: Point,
    glyph_height: f64,
}

impl OpenFragment {
    fn bounds(&self) -> BoundingBox {
        let height = self.glyph_height.max(1.0);
        // glyph origins sit on the baseline; grow the box upward by one glyph height
        BoundingBox::new(
            self.min.x as f32,
            (self.min.y - height) as f32,
            (self.max.x - self.min.x + height * 0.5) as f32,
            (self.max.y - self.min.y + height) as f32,
        )
    }
}

#[derive(Default)]
struct FragmentDevice {
    fragments: Vec<TextFragment>,
    open: Option<OpenFragment>,
    last_point: Option<Point>,
    last_glyph: Option<(char, i32, i32)>,
}

impl FragmentDevice {
    fn finish(mut self) -> Vec<TextFragment> {
        self.close_fragment();
        self.fragments
    }

    fn close_fragment(&mut self) {
        let Some(open) = self.open.take() else {
            return;
        };
        let text = open.text.trim();
        if text.is_empty() {
            return;
        }
        self.fragments.push(TextFragment::new(text, open.bounds()));
    }

    fn push_char(&mut self, ch: char, position: Point, glyph_height: f64) {
        if let Some(last) = self.last_point
            && (position.y - last.y).abs() > LINE_BREAK_THRESHOLD
        {
            self.close_fragment();
        }
        self.last_point = Some(position);

        if ch == '\n' || ch == '\r' {
            self.close_fragment();
            return;
        }

        let open = self.open.get_or_insert_with(|| OpenFragment {
            text: String::new(),
            min: position,
            max: position,
            glyph_height,
        });
        if ch.is_whitespace() {
            if !open.text.ends_with(' ') {
                open.text.push(' ');
            }
            return;
        }

        open.text.push(ch);
        open.min = Point::new(open.min.x.min(position.x), open.min.y.min(position.y));
        open.max = Point::new(open.max.x.max(position.x), open.max.y.max(position.y));
        open.glyph_height = open.glyph_height.max(glyph_height);
    }

    fn is_duplicate_glyph(&self, ch: char, position: Point) -> bool {
        self.last_glyph == Some((ch, quantize_coord(position.x), quantize_coord(position.y)))
    }
}

impl<'a> Device<'a> for FragmentDevice {
    fn set_soft_mask(&mut self, _mask: Option<SoftMask<'a>>) {}

    fn set_blend_mode(&mut self, _blend_mode: BlendMode) {}

    fn draw_path(
        &mut self,
        _path: &BezPath,
        _transform: Affine,
        _paint: &Paint<'a>,
        _draw_mode: &PathDrawMode,
    ) {
    }

    fn push_clip_path(&mut self, _clip_path: &ClipPath) {}

    fn push_transparency_group(
        &mut self,
        _opacity: f32,
        _mask: Option<SoftMask<'a>>,
        _blend_mode: BlendMode,
    ) {
    }

    fn draw_glyph(
        &mut self,
        glyph: &Glyph<'a>,
        transform: Affine,
        glyph_transform: Affine,
        _paint: &Paint<'a>,
        _draw_mode: &GlyphDrawMode,
    ) {
        let Some(ch) = glyph.as_unicode() else {
            return;
        };

        let affine = transform * glyph_transform;
        let position = affine * Point::ORIGIN;
        if self.is_duplicate_glyph(ch, position) {
            return;
        }
        self.last_glyph = Some((ch, quantize_coord(position.x), quantize_coord(position.y)));
        self.push_char(ch, position, glyph_height(affine));
    }

    fn draw_image(&mut self, _image: Image<'a, '_>, _transform: Affine) {}

    fn pop_clip_path(&mut self) {}

    fn pop_transparency_group(&mut self) {}
}

fn glyph_height(affine: Affine) -> f64 {
    let [_, _, c, d, _, _] = affine.as_coeffs();
    let raw = c.hypot(d);
    // glyph space is either em units or thousandths of an em depending on the font
    let height = if raw < 1.0 { raw * 1000.0 } else { raw };
    if height.is_finite() && height > 0.0 {
        height
    } else {
        FALLBACK_GLYPH_HEIGHT
    }
}

fn quantize_coord(value: f64) -> i32 {
    (value * 100.0).round() as i32
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::backend::PageDecoder;
    use crate::error::EngineError;
    use crate::page::PageNumber;
    use crate::test_support::{build_pdf, build_pdf_with_raw_streams};
    use crate::view::Rotation;

    use super::PdfDoc;

    fn page(n: u32) -> PageNumber {
        PageNumber::new(n).expect("test page is non-zero")
    }

    fn open(bytes: Vec<u8>) -> PdfDoc {
        PdfDoc::from_bytes(Arc::new(bytes)).expect("pdf should open")
    }

    #[test]
    fn from_bytes_rejects_non_pdf_input() {
        let result = PdfDoc::from_bytes(Arc::new(b"hello".to_vec()));
        assert!(matches!(result, Err(EngineError::DocumentLoad(_))));
    }

    #[test]
    fn open_document_uses_hayro_decoder() {
        let decoder = crate::backend::open_document(Arc::new(build_pdf(&["one", "two", "three"])))
            .expect("document should open");
        assert_eq!(decoder.page_count(), 3);
        assert!(crate::backend::open_document(Arc::new(Vec::new())).is_err());
    }

    #[test]
    fn from_bytes_reports_page_count() {
        let doc = open(build_pdf(&["first page", "second page"]));
        assert_eq!(doc.page_count(), 2);
    }

    #[test]
    fn render_page_rejects_out_of_range_page() {
        let doc = open(build_pdf(&["hello"]));
        let err = doc
            .render_page(page(8), 1.0, Rotation::Deg0)
            .expect_err("page should be invalid");
        assert!(matches!(
            err,
            EngineError::InvalidArgument(message) if message == "page index is out of range"
        ));
    }

    #[test]
    fn page_dimensions_read_page_size() {
        let doc = open(build_pdf(&["hello"]));
        let (width, height) = doc
            .page_dimensions(page(1))
            .expect("dimensions should be available");
        assert!((width - 300.0).abs() < f32::EPSILON);
        assert!((height - 300.0).abs() < f32::EPSILON);
    }

    #[test]
    fn render_page_swaps_axes_for_quarter_turns() {
        let doc = open(build_pdf(&["render me"]));
        let upright = doc
            .render_page(page(1), 1.0, Rotation::Deg0)
            .expect("render should succeed");
        assert_eq!(
            upright.pixels.len(),
            upright.width as usize * upright.height as usize * 4
        );

        let turned = doc
            .render_page(page(1), 1.0, Rotation::Deg90)
            .expect("rotated render should succeed");
        assert_eq!(turned.width, upright.height);
        assert_eq!(turned.height, upright.width);
    }

    #[test]
    fn text_fragments_carry_page_text() {
        let doc = open(build_pdf(&["hello world", "second page"]));
        let fragments = doc.text_fragments(page(1)).expect("extract should succeed");
        let joined: String = fragments
            .iter()
            .flat_map(|fragment| fragment.text.chars())
            .filter(|ch| !ch.is_whitespace())
            .collect();
        assert!(joined.contains("helloworld"));
        assert!(fragments.iter().all(|fragment| !fragment.bounds.is_empty()));
    }

    #[test]
    fn text_fragments_keep_tj_runs_together() {
        let doc = open(build_pdf_with_raw_streams(&[
            "BT /F1 14 Tf 36 260 Td [(hello) -220 (world)] TJ ET",
        ]));
        let fragments = doc.text_fragments(page(1)).expect("extract should succeed");
        let joined: String = fragments
            .iter()
            .flat_map(|fragment| fragment.text.chars())
            .filter(|ch| !ch.is_whitespace())
            .collect();
        assert!(
            joined.to_lowercase().contains("helloworld"),
            "expected stable extraction without false splits, got: {fragments:?}"
        );
    }
}
