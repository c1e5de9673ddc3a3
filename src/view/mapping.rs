use kurbo::{Point, Rect};

use crate::page::RasterSize;

/// Maps pointer positions onto one page's raster.
///
/// `layout` is the page's on-screen box in scroll-content coordinates, as the
/// host recorded it. The host lays out the rotated page, so the box already
/// has the raster's orientation; the raster (and the drawing surface sized to
/// it) may only be denser, and coordinates are scaled by the ratio of the two.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageMapping {
    layout: Rect,
    raster: RasterSize,
}

impl PageMapping {
    pub fn new(layout: Rect, raster: RasterSize) -> Option<Self> {
        if layout.width() <= 0.0 || layout.height() <= 0.0 || raster.is_empty() {
            return None;
        }
        Some(Self { layout, raster })
    }

    /// Content-space point to raster pixel coordinates. Points outside the
    /// page are not clamped so strokes can leave and re-enter the surface.
    pub fn to_raster(&self, content_point: Point) -> Point {
        let sx = f64::from(self.raster.width) / self.layout.width();
        let sy = f64::from(self.raster.height) / self.layout.height();
        Point::new(
            (content_point.x - self.layout.x0) * sx,
            (content_point.y - self.layout.y0) * sy,
        )
    }
}

#[cfg(test)]
mod tests {
    use kurbo::{Point, Rect};

    use crate::page::RasterSize;

    use super::PageMapping;

    fn close(left: Point, right: Point) -> bool {
        (left - right).hypot() < 1e-6
    }

    #[test]
    fn to_raster_accounts_for_layout_offset_and_density() {
        let mapping = PageMapping::new(
            Rect::new(10.0, 1000.0, 110.0, 1200.0),
            RasterSize::new(200, 400),
        )
        .expect("mapping should be valid");

        let raster = mapping.to_raster(Point::new(60.0, 1100.0));
        assert!(close(raster, Point::new(100.0, 200.0)));
    }

    #[test]
    fn rotated_layout_maps_onto_rotated_raster() {
        // a 100x200 page turned a quarter: laid out landscape at half density
        let mapping = PageMapping::new(
            Rect::new(0.0, 500.0, 100.0, 550.0),
            RasterSize::new(200, 100),
        )
        .expect("mapping should be valid");

        assert!(close(mapping.to_raster(Point::new(100.0, 550.0)), Point::new(200.0, 100.0)));
        assert!(close(mapping.to_raster(Point::new(-5.0, 500.0)), Point::new(-10.0, 0.0)));
    }

    #[test]
    fn degenerate_geometry_is_rejected() {
        assert!(PageMapping::new(Rect::new(0.0, 0.0, 0.0, 10.0), RasterSize::new(10, 10)).is_none());
        assert!(PageMapping::new(Rect::new(0.0, 0.0, 10.0, 10.0), RasterSize::new(0, 10)).is_none());
    }
}
