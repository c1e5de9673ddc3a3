//! Shared fixtures for unit tests: minimal hand-built PDFs and an in-memory
//! decoder.

use std::collections::HashMap;
use std::sync::Arc;

use crate::backend::{DocumentLoader, PageDecoder, RgbaFrame, TextFragment};
use crate::error::{EngineError, EngineResult};
use crate::page::{BoundingBox, PageNumber};
use crate::view::Rotation;

pub(crate) fn page(n: u32) -> PageNumber {
    PageNumber::new(n).expect("test page is non-zero")
}

/// Decoder with fixed page text; every page is `width x height` points.
#[derive(Debug, Clone)]
pub(crate) struct StubDecoder {
    pub(crate) pages: Vec<Vec<TextFragment>>,
    pub(crate) width: f32,
    pub(crate) height: f32,
    pub(crate) failing_pages: HashMap<usize, String>,
}

impl StubDecoder {
    pub(crate) fn with_texts(texts: &[&str]) -> Self {
        let pages = texts
            .iter()
            .map(|text| {
                if text.is_empty() {
                    Vec::new()
                } else {
                    vec![TextFragment::new(
                        *text,
                        BoundingBox::new(10.0, 10.0, 8.0 * text.len() as f32, 12.0),
                    )]
                }
            })
            .collect();
        Self {
            pages,
            width: 100.0,
            height: 200.0,
            failing_pages: HashMap::new(),
        }
    }

    pub(crate) fn with_fragments(pages: Vec<Vec<TextFragment>>) -> Self {
        Self {
            pages,
            width: 100.0,
            height: 200.0,
            failing_pages: HashMap::new(),
        }
    }

    fn check(&self, page: PageNumber) -> EngineResult<()> {
        if page.index() >= self.pages.len() {
            return Err(EngineError::invalid_argument("page index is out of range"));
        }
        if let Some(message) = self.failing_pages.get(&page.index()) {
            return Err(EngineError::page_render(
                page,
                EngineError::unsupported(message.clone()),
            ));
        }
        Ok(())
    }
}

impl PageDecoder for StubDecoder {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_dimensions(&self, page: PageNumber) -> EngineResult<(f32, f32)> {
        self.check(page)?;
        Ok((self.width, self.height))
    }

    fn render_page(
        &self,
        page: PageNumber,
        scale: f32,
        rotation: Rotation,
    ) -> EngineResult<RgbaFrame> {
        self.check(page)?;
        let mut width = (self.width * scale).round().max(1.0) as u32;
        let mut height = (self.height * scale).round().max(1.0) as u32;
        if rotation.is_quarter_turn() {
            std::mem::swap(&mut width, &mut height);
        }
        Ok(RgbaFrame {
            width,
            height,
            pixels: vec![0xff; width as usize * height as usize * 4].into(),
        })
    }

    fn text_fragments(&self, page: PageNumber) -> EngineResult<Vec<TextFragment>> {
        self.check(page)?;
        Ok(self.pages[page.index()].clone())
    }
}

#[derive(Debug, Clone)]
pub(crate) struct StubLoader {
    pub(crate) decoder: StubDecoder,
}

impl DocumentLoader for StubLoader {
    fn load(&self, _bytes: Arc<Vec<u8>>) -> EngineResult<Box<dyn PageDecoder>> {
        Ok(Box::new(self.decoder.clone()))
    }
}

pub(crate) fn build_pdf(page_texts: &[&str]) -> Vec<u8> {
    let streams: Vec<String> = page_texts
        .iter()
        .map(|text| format!("BT /F1 14 Tf 36 260 Td ({}) Tj ET", escape_literal(text)))
        .collect();
    build_pdf_from_streams(&streams)
}

pub(crate) fn build_pdf_with_raw_streams(page_streams: &[&str]) -> Vec<u8> {
    let streams: Vec<String> = page_streams.iter().map(|s| (*s).to_string()).collect();
    build_pdf_from_streams(&streams)
}

fn build_pdf_from_streams(page_streams: &[String]) -> Vec<u8> {
    let page_streams = if page_streams.is_empty() {
        vec![String::new()]
    } else {
        page_streams.to_vec()
    };
    let page_count = page_streams.len();
    let kids = (0..page_count)
        .map(|i| format!("{} 0 R", 4 + i * 2))
        .collect::<Vec<_>>()
        .join(" ");

    let mut objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!("<< /Type /Pages /Kids [{kids}] /Count {page_count} >>"),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
    ];
    for (index, stream) in page_streams.iter().enumerate() {
        let content_id = 5 + index * 2;
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 300 300] /Resources << /Font << /F1 3 0 R >> >> /Contents {content_id} 0 R >>"
        ));
        objects.push(format!(
            "<< /Length {} >>\nstream\n{stream}\nendstream",
            stream.len()
        ));
    }

    let mut bytes = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (index, object) in objects.iter().enumerate() {
        offsets.push(bytes.len());
        bytes.extend_from_slice(format!("{} 0 obj\n{object}\nendobj\n", index + 1).as_bytes());
    }

    let xref_start = bytes.len();
    bytes.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    bytes.extend_from_slice(b"0000000000 65535 f \n");
    for offset in offsets {
        bytes.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    bytes.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_start}\n%%EOF\n",
            objects.len() + 1
        )
        .as_bytes(),
    );
    bytes
}

fn escape_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            '\n' => out.push_str("\\n"),
            _ => out.push(ch),
        }
    }
    out
}
