use std::fmt;

use log::debug;

use crate::view::{Rotation, SCALE_LADDER};

/// View position carried in a link's query string, e.g.
/// `?page=3&scroll=420&scale=1.5&rotation=90`.
///
/// Every field is optional. Malformed or out-of-range values are dropped
/// individually so one bad parameter never discards the rest.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DeepLink {
    /// Requested page; clamped to the document when applied.
    pub page: Option<i64>,
    /// Vertical scroll offset in content pixels.
    pub scroll: Option<f64>,
    pub scale: Option<f32>,
    pub rotation: Option<Rotation>,
}

impl DeepLink {
    pub fn parse(query: &str) -> Self {
        let query = query.trim();
        let query = query
            .strip_prefix('?')
            .or_else(|| query.strip_prefix('#'))
            .unwrap_or(query);

        let mut link = Self::default();
        for pair in query.split('&').filter(|pair| !pair.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = value.trim();
            match key.trim() {
                "page" => link.page = parse_page(value).or(link.page),
                "scroll" => link.scroll = parse_scroll(value).or(link.scroll),
                "scale" => link.scale = parse_scale(value).or(link.scale),
                "rotation" => link.rotation = parse_rotation(value).or(link.rotation),
                other => debug!("ignoring unknown link parameter {other:?}"),
            }
        }
        link
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl fmt::Display for DeepLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(page) = self.page {
            parts.push(format!("page={page}"));
        }
        if let Some(scroll) = self.scroll {
            parts.push(format!("scroll={}", scroll.round()));
        }
        if let Some(scale) = self.scale {
            parts.push(format!("scale={scale}"));
        }
        if let Some(rotation) = self.rotation {
            parts.push(format!("rotation={}", rotation.degrees()));
        }
        if parts.is_empty() {
            return Ok(());
        }
        write!(f, "?{}", parts.join("&"))
    }
}

fn parse_page(value: &str) -> Option<i64> {
    let page = value.parse::<i64>().ok().filter(|page| *page >= 1);
    if page.is_none() {
        debug!("ignoring link page {value:?}");
    }
    page
}

fn parse_scroll(value: &str) -> Option<f64> {
    let scroll = value
        .parse::<f64>()
        .ok()
        .filter(|scroll| scroll.is_finite() && *scroll >= 0.0);
    if scroll.is_none() {
        debug!("ignoring link scroll {value:?}");
    }
    scroll
}

fn parse_scale(value: &str) -> Option<f32> {
    let first = SCALE_LADDER[0];
    let last = SCALE_LADDER[SCALE_LADDER.len() - 1];
    let scale = value
        .parse::<f32>()
        .ok()
        .filter(|scale| scale.is_finite() && (first..=last).contains(scale));
    if scale.is_none() {
        debug!("ignoring link scale {value:?}");
    }
    scale
}

fn parse_rotation(value: &str) -> Option<Rotation> {
    let rotation = value.parse::<i32>().ok().and_then(Rotation::from_degrees);
    if rotation.is_none() {
        debug!("ignoring link rotation {value:?}");
    }
    rotation
}
