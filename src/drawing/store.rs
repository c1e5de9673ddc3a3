use std::collections::HashMap;

use kurbo::Point;
use log::debug;

use crate::page::{PageNumber, RasterSize};

use super::{DrawingSurface, Pen};

/// Per-page free-hand surfaces.
///
/// Surfaces are created the first time a page is initialized and live until
/// `dispose` or `clear_all`. Operations on pages that were never initialized
/// are invalid tool input: they are ignored and report `false`.
#[derive(Debug, Default)]
pub struct DrawingSurfaceStore {
    surfaces: HashMap<PageNumber, DrawingSurface>,
}

impl DrawingSurfaceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the page's surface at `size`, or resizes an existing one and
    /// restores its snapshot onto it. Calling it again with the same size
    /// leaves the live canvas untouched.
    pub fn initialize(&mut self, page: PageNumber, size: RasterSize) -> bool {
        if size.is_empty() {
            debug!(
                "ignoring drawing surface init for page {page}: empty size {}x{}",
                size.width, size.height
            );
            return false;
        }
        match self.surfaces.get_mut(&page) {
            Some(surface) => {
                surface.resize_to(size);
            }
            None => {
                self.surfaces.insert(page, DrawingSurface::blank(size));
            }
        }
        true
    }

    pub fn draw_segment(&mut self, page: PageNumber, from: Point, to: Point, pen: &Pen) -> bool {
        let Some(surface) = self.surface_for_input(page, "draw") else {
            return false;
        };
        surface.draw_segment(from, to, pen.color, pen.width);
        true
    }

    pub fn erase_area(&mut self, page: PageNumber, from: Point, to: Point, radius: f32) -> bool {
        let Some(surface) = self.surface_for_input(page, "erase") else {
            return false;
        };
        surface.erase(from, to, radius);
        true
    }

    pub fn snapshot(&mut self, page: PageNumber) -> bool {
        let Some(surface) = self.surface_for_input(page, "snapshot") else {
            return false;
        };
        surface.snapshot();
        true
    }

    pub fn restore(&mut self, page: PageNumber) -> bool {
        let Some(surface) = self.surface_for_input(page, "restore") else {
            return false;
        };
        surface.restore();
        true
    }

    /// Drops every canvas and every snapshot.
    pub fn clear_all(&mut self) {
        self.surfaces.clear();
    }

    pub fn dispose(&mut self, page: PageNumber) -> bool {
        self.surfaces.remove(&page).is_some()
    }

    pub fn contains(&self, page: PageNumber) -> bool {
        self.surfaces.contains_key(&page)
    }

    pub fn get(&self, page: PageNumber) -> Option<&DrawingSurface> {
        self.surfaces.get(&page)
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    fn surface_for_input(&mut self, page: PageNumber, action: &str) -> Option<&mut DrawingSurface> {
        let surface = self.surfaces.get_mut(&page);
        if surface.is_none() {
            debug!("ignoring {action} on page {page}: no drawing surface");
        }
        surface
    }
}
