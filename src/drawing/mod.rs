mod store;
mod surface;

use image::Rgba;

pub use store::DrawingSurfaceStore;
pub use surface::DrawingSurface;

use crate::config::DrawingConfig;

pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pen {
    pub color: Rgba<u8>,
    pub width: f32,
}

impl Default for Pen {
    fn default() -> Self {
        Self {
            color: Rgba([255, 0, 0, 255]),
            width: 2.0,
        }
    }
}

impl Pen {
    pub fn from_config(config: &DrawingConfig) -> Self {
        let fallback = Self::default();
        Self {
            color: parse_hex_color(&config.pen_color).unwrap_or(fallback.color),
            width: config.pen_width,
        }
    }
}

/// Parses `#rrggbb` or `#rrggbbaa`.
pub fn parse_hex_color(value: &str) -> Option<Rgba<u8>> {
    let hex = value.strip_prefix('#')?;
    if !hex.is_ascii() || !matches!(hex.len(), 6 | 8) {
        return None;
    }
    let channel = |at: usize| u8::from_str_radix(&hex[at..at + 2], 16).ok();
    let alpha = if hex.len() == 8 { channel(6)? } else { 255 };
    Some(Rgba([channel(0)?, channel(2)?, channel(4)?, alpha]))
}
