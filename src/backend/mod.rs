use std::path::Path;
use std::sync::Arc;

use crate::error::{EngineError, EngineResult};

mod hayro;
mod traits;

pub use hayro::{HayroLoader, PdfDoc};
pub use traits::{DocumentLoader, PageDecoder, RgbaFrame, TextFragment};

pub fn open_document(bytes: Arc<Vec<u8>>) -> EngineResult<Box<dyn PageDecoder>> {
    HayroLoader.load(bytes)
}

pub fn read_document_bytes(path: impl AsRef<Path>) -> EngineResult<Arc<Vec<u8>>> {
    let path = path.as_ref();
    if path.as_os_str().is_empty() {
        return Err(EngineError::invalid_argument("pdf path must not be empty"));
    }
    if !path.exists() {
        return Err(EngineError::io_with_context(
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing file"),
            format!("pdf file not found: {}", path.display()),
        ));
    }
    if !path.is_file() {
        return Err(EngineError::invalid_argument(
            "pdf path must be a regular file",
        ));
    }

    let bytes = std::fs::read(path).map_err(|source| {
        EngineError::io_with_context(source, format!("failed to read {}", path.display()))
    })?;
    Ok(Arc::new(bytes))
}
