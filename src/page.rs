use std::fmt;
use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

/// 1-indexed page number. Page 0 does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct PageNumber(NonZeroU32);

impl PageNumber {
    pub const FIRST: PageNumber = PageNumber(NonZeroU32::MIN);

    pub fn new(page: u32) -> Option<Self> {
        NonZeroU32::new(page).map(Self)
    }

    /// Converts a 0-based decoder index.
    pub fn from_index(index: usize) -> Option<Self> {
        let page = u32::try_from(index.checked_add(1)?).ok()?;
        Self::new(page)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }

    /// 0-based index as used by the decoder.
    pub fn index(self) -> usize {
        (self.0.get() - 1) as usize
    }

    pub fn saturating_add(self, delta: u32) -> Self {
        Self(self.0.saturating_add(delta))
    }

    pub fn saturating_sub(self, delta: u32) -> Self {
        Self::new(self.get().saturating_sub(delta)).unwrap_or(Self::FIRST)
    }

    /// Clamps an arbitrary requested page into `1..=page_count`.
    pub fn clamped(requested: i64, page_count: usize) -> Option<Self> {
        let last = u32::try_from(page_count).ok().filter(|count| *count > 0)?;
        let page = requested.clamp(1, i64::from(last)) as u32;
        Self::new(page)
    }
}

impl fmt::Display for PageNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u32> for PageNumber {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| "page numbers start at 1".to_string())
    }
}

impl From<PageNumber> for u32 {
    fn from(page: PageNumber) -> Self {
        page.get()
    }
}

/// Axis-aligned box in whatever space the owner documents.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

}

/// Raster dimensions of a page at the current transform, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RasterSize {
    pub width: u32,
    pub height: u32,
}

impl RasterSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[cfg(test)]
mod tests {
    use super::PageNumber;

    #[test]
    fn page_number_rejects_zero_and_maps_indices() {
        assert!(PageNumber::new(0).is_none());
        let third = PageNumber::from_index(2).expect("index 2 is page 3");
        assert_eq!(third.get(), 3);
        assert_eq!(third.index(), 2);
        assert_eq!(third.saturating_sub(5), PageNumber::FIRST);
    }

    #[test]
    fn clamped_pulls_requests_into_document_range() {
        assert_eq!(PageNumber::clamped(-4, 10).map(PageNumber::get), Some(1));
        assert_eq!(PageNumber::clamped(40, 10).map(PageNumber::get), Some(10));
        assert_eq!(PageNumber::clamped(4, 10).map(PageNumber::get), Some(4));
        assert!(PageNumber::clamped(1, 0).is_none());
    }

    #[test]
    fn page_number_serializes_as_plain_integer() {
        let page = PageNumber::new(2).expect("page 2 is valid");
        assert_eq!(serde_json::to_string(&page).expect("serialize"), "2");
        assert!(serde_json::from_str::<PageNumber>("0").is_err());
    }
}
