use fast_image_resize as fr;
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use kurbo::Point;
use log::debug;

use crate::page::RasterSize;

use super::TRANSPARENT;

const STAMP_SPACING_PX: f64 = 0.5;

/// One page's free-hand overlay: the live canvas strokes are drawn into and
/// the last committed snapshot.
///
/// Persistence is pixel-level only. Restoring onto a canvas of a different
/// size stretches the snapshot, which distorts strokes when the aspect ratio
/// changes.
#[derive(Debug, Clone)]
pub struct DrawingSurface {
    canvas: RgbaImage,
    snapshot: Option<RgbaImage>,
}

impl DrawingSurface {
    pub fn blank(size: RasterSize) -> Self {
        Self {
            canvas: RgbaImage::from_pixel(size.width, size.height, TRANSPARENT),
            snapshot: None,
        }
    }

    pub fn size(&self) -> RasterSize {
        RasterSize::new(self.canvas.width(), self.canvas.height())
    }

    pub fn canvas(&self) -> &RgbaImage {
        &self.canvas
    }

    pub fn snapshot_image(&self) -> Option<&RgbaImage> {
        self.snapshot.as_ref()
    }

    /// Resizes to `size` and restores the snapshot onto the new canvas.
    /// Returns false when the size already matches.
    pub fn resize_to(&mut self, size: RasterSize) -> bool {
        if self.size() == size {
            return false;
        }
        self.canvas = RgbaImage::from_pixel(size.width, size.height, TRANSPARENT);
        self.restore();
        true
    }

    pub fn draw_segment(&mut self, from: Point, to: Point, color: Rgba<u8>, width: f32) {
        let radius = (f64::from(width) / 2.0).max(0.5);
        stamp_segment(&mut self.canvas, from, to, radius, color);
    }

    pub fn erase(&mut self, from: Point, to: Point, radius: f32) {
        stamp_segment(
            &mut self.canvas,
            from,
            to,
            f64::from(radius).max(0.5),
            TRANSPARENT,
        );
    }

    pub fn snapshot(&mut self) {
        self.snapshot = Some(self.canvas.clone());
    }

    /// Replaces the canvas with the snapshot, stretched to the canvas size, or
    /// blanks it when nothing was committed yet.
    pub fn restore(&mut self) {
        let (width, height) = self.canvas.dimensions();
        self.canvas = match self.snapshot.as_ref() {
            Some(snapshot) if snapshot.dimensions() == (width, height) => snapshot.clone(),
            Some(snapshot) => stretch(snapshot, width, height),
            None => RgbaImage::from_pixel(width, height, TRANSPARENT),
        };
    }

    pub fn is_blank(&self) -> bool {
        self.canvas.pixels().all(|pixel| pixel.0[3] == 0)
    }
}

fn stamp_segment(canvas: &mut RgbaImage, from: Point, to: Point, radius: f64, color: Rgba<u8>) {
    let length = (to - from).hypot();
    let steps = (length / STAMP_SPACING_PX).ceil().max(1.0) as usize;
    for step in 0..=steps {
        let center = from.lerp(to, step as f64 / steps as f64);
        stamp_disc(canvas, center, radius, color);
    }
}

fn stamp_disc(canvas: &mut RgbaImage, center: Point, radius: f64, color: Rgba<u8>) {
    let (width, height) = canvas.dimensions();
    if width == 0 || height == 0 {
        return;
    }
    let x_min = (center.x - radius).floor().max(0.0);
    let y_min = (center.y - radius).floor().max(0.0);
    let x_max = (center.x + radius).ceil().min(f64::from(width - 1));
    let y_max = (center.y + radius).ceil().min(f64::from(height - 1));
    if x_min > x_max || y_min > y_max {
        return;
    }

    let radius_sq = radius * radius;
    for y in (y_min as u32)..=(y_max as u32) {
        for x in (x_min as u32)..=(x_max as u32) {
            let dx = f64::from(x) + 0.5 - center.x;
            let dy = f64::from(y) + 0.5 - center.y;
            if dx * dx + dy * dy <= radius_sq {
                canvas.put_pixel(x, y, color);
            }
        }
    }
}

fn stretch(source: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    match stretch_simd(source, width, height) {
        Some(image) => image,
        None => {
            debug!("simd resize unavailable, falling back to image resize");
            imageops::resize(source, width, height, FilterType::Triangle)
        }
    }
}

fn stretch_simd(source: &RgbaImage, width: u32, height: u32) -> Option<RgbaImage> {
    let src = fr::images::Image::from_vec_u8(
        source.width(),
        source.height(),
        source.as_raw().clone(),
        fr::PixelType::U8x4,
    )
    .ok()?;
    let mut dst = fr::images::Image::new(width, height, fr::PixelType::U8x4);
    let options = fr::ResizeOptions::new()
        .resize_alg(fr::ResizeAlg::Convolution(fr::FilterType::Bilinear));
    fr::Resizer::new().resize(&src, &mut dst, &options).ok()?;
    RgbaImage::from_raw(width, height, dst.into_vec())
}
