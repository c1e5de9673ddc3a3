use kurbo::{Point, Vec2};
use log::debug;

use crate::drawing::{DrawingSurfaceStore, Pen};
use crate::page::PageNumber;

use super::{PagePoint, Tool};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Gesture {
    Idle,
    Panning { last: Point },
    Stroking { page: PageNumber, last: Point },
    Erasing { page: PageNumber, last: Point },
    Selecting,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerOutcome {
    Ignored,
    PanStarted,
    /// First pan move since the last frame; the host should schedule one
    /// animation frame.
    FrameRequested,
    /// Pan move folded into an already requested frame.
    Coalesced,
    StrokeStarted(PageNumber),
    Drawn(PageNumber),
    Erased(PageNumber),
    Committed(PageNumber),
    PanEnded,
    SelectionStarted,
    SelectionEnded,
}

/// Routes pointer input to the active tool.
///
/// Pan moves accumulate into one pending scroll delta that is applied at
/// most once per animation frame. Draw and erase edit the live canvas of a
/// single page and snapshot it on pointer-up; anything that ends the gesture
/// early restores the last snapshot instead.
#[derive(Debug)]
pub struct ToolController {
    tool: Tool,
    gesture: Gesture,
    pending_pan: Vec2,
    frame_requested: bool,
}

impl Default for ToolController {
    fn default() -> Self {
        Self::new(Tool::default())
    }
}

impl ToolController {
    pub fn new(tool: Tool) -> Self {
        Self {
            tool,
            gesture: Gesture::Idle,
            pending_pan: Vec2::ZERO,
            frame_requested: false,
        }
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    /// Page whose surface the current stroke or erase edits.
    pub fn active_page(&self) -> Option<PageNumber> {
        match self.gesture {
            Gesture::Stroking { page, .. } | Gesture::Erasing { page, .. } => Some(page),
            _ => None,
        }
    }

    pub fn is_frame_requested(&self) -> bool {
        self.frame_requested
    }

    /// Switches tools. Any stroke in progress is discarded without being
    /// committed and a pending pan frame is dropped. Returns the page whose
    /// uncommitted edits were discarded.
    pub fn set_tool(&mut self, tool: Tool, surfaces: &mut DrawingSurfaceStore) -> Option<PageNumber> {
        let discarded = self.cancel_gesture(surfaces);
        self.tool = tool;
        discarded
    }

    pub fn pointer_down(
        &mut self,
        viewport_point: Point,
        target: Option<PagePoint>,
        surfaces: &mut DrawingSurfaceStore,
        eraser_radius: f32,
    ) -> PointerOutcome {
        if self.gesture != Gesture::Idle {
            self.cancel_gesture(surfaces);
        }

        match self.tool {
            Tool::Pan => {
                self.gesture = Gesture::Panning {
                    last: viewport_point,
                };
                self.pending_pan = Vec2::ZERO;
                self.frame_requested = false;
                PointerOutcome::PanStarted
            }
            Tool::Draw => {
                let Some(target) = self.surface_target(target, surfaces) else {
                    return PointerOutcome::Ignored;
                };
                self.gesture = Gesture::Stroking {
                    page: target.page,
                    last: target.raster,
                };
                PointerOutcome::StrokeStarted(target.page)
            }
            Tool::Erase => {
                let Some(target) = self.surface_target(target, surfaces) else {
                    return PointerOutcome::Ignored;
                };
                surfaces.erase_area(target.page, target.raster, target.raster, eraser_radius);
                self.gesture = Gesture::Erasing {
                    page: target.page,
                    last: target.raster,
                };
                PointerOutcome::Erased(target.page)
            }
            Tool::Select => {
                self.gesture = Gesture::Selecting;
                PointerOutcome::SelectionStarted
            }
        }
    }

    /// `target` must be mapped against the page returned by `active_page`
    /// while a stroke is in progress, even when the pointer has left it.
    pub fn pointer_move(
        &mut self,
        viewport_point: Point,
        target: Option<PagePoint>,
        surfaces: &mut DrawingSurfaceStore,
        pen: &Pen,
        eraser_radius: f32,
    ) -> PointerOutcome {
        match self.gesture {
            Gesture::Panning { last } => {
                self.pending_pan += last - viewport_point;
                self.gesture = Gesture::Panning {
                    last: viewport_point,
                };
                if self.frame_requested {
                    PointerOutcome::Coalesced
                } else {
                    self.frame_requested = true;
                    PointerOutcome::FrameRequested
                }
            }
            Gesture::Stroking { page, last } => {
                let Some(point) = point_on(page, target) else {
                    return PointerOutcome::Ignored;
                };
                surfaces.draw_segment(page, last, point, pen);
                self.gesture = Gesture::Stroking { page, last: point };
                PointerOutcome::Drawn(page)
            }
            Gesture::Erasing { page, last } => {
                let Some(point) = point_on(page, target) else {
                    return PointerOutcome::Ignored;
                };
                surfaces.erase_area(page, last, point, eraser_radius);
                self.gesture = Gesture::Erasing { page, last: point };
                PointerOutcome::Erased(page)
            }
            Gesture::Idle | Gesture::Selecting => PointerOutcome::Ignored,
        }
    }

    pub fn pointer_up(&mut self, surfaces: &mut DrawingSurfaceStore) -> PointerOutcome {
        let gesture = std::mem::replace(&mut self.gesture, Gesture::Idle);
        match gesture {
            Gesture::Panning { .. } => {
                self.cancel_frame();
                PointerOutcome::PanEnded
            }
            Gesture::Stroking { page, .. } | Gesture::Erasing { page, .. } => {
                surfaces.snapshot(page);
                PointerOutcome::Committed(page)
            }
            Gesture::Selecting => PointerOutcome::SelectionEnded,
            Gesture::Idle => PointerOutcome::Ignored,
        }
    }

    /// Called once per animation frame. Returns the scroll delta accumulated
    /// since the frame was requested, if any.
    pub fn take_frame_delta(&mut self) -> Option<Vec2> {
        if !self.frame_requested {
            return None;
        }
        self.frame_requested = false;
        let delta = std::mem::replace(&mut self.pending_pan, Vec2::ZERO);
        (delta != Vec2::ZERO).then_some(delta)
    }

    fn cancel_gesture(&mut self, surfaces: &mut DrawingSurfaceStore) -> Option<PageNumber> {
        let gesture = std::mem::replace(&mut self.gesture, Gesture::Idle);
        self.cancel_frame();
        match gesture {
            Gesture::Stroking { page, .. } | Gesture::Erasing { page, .. } => {
                surfaces.restore(page);
                debug!("discarded uncommitted edits on page {page}");
                Some(page)
            }
            _ => None,
        }
    }

    fn cancel_frame(&mut self) {
        self.frame_requested = false;
        self.pending_pan = Vec2::ZERO;
    }

    fn surface_target(
        &self,
        target: Option<PagePoint>,
        surfaces: &DrawingSurfaceStore,
    ) -> Option<PagePoint> {
        let target = target?;
        if !surfaces.contains(target.page) {
            debug!(
                "ignoring {} on page {} without a drawing surface",
                self.tool.id(),
                target.page
            );
            return None;
        }
        Some(target)
    }
}

fn point_on(page: PageNumber, target: Option<PagePoint>) -> Option<Point> {
    target
        .filter(|target| target.page == page)
        .map(|target| target.raster)
}

#[cfg(test)]
mod tests {
    use image::Rgba;
    use kurbo::{Point, Vec2};

    use crate::drawing::{DrawingSurfaceStore, Pen};
    use crate::page::RasterSize;
    use crate::test_support::page;
    use crate::tool::{PagePoint, Tool};

    use super::{PointerOutcome, ToolController};

    const ERASER: f32 = 6.0;

    fn pen() -> Pen {
        Pen {
            color: Rgba([0, 128, 0, 255]),
            width: 3.0,
        }
    }

    fn surfaces() -> DrawingSurfaceStore {
        let mut store = DrawingSurfaceStore::new();
        store.initialize(page(1), RasterSize::new(50, 50));
        store
    }

    fn at(x: f64, y: f64) -> Option<PagePoint> {
        Some(PagePoint::new(page(1), Point::new(x, y)))
    }

    #[test]
    fn draw_stroke_commits_on_pointer_up() {
        let mut store = surfaces();
        let mut tools = ToolController::new(Tool::Draw);

        let down = tools.pointer_down(Point::ZERO, at(5.0, 25.0), &mut store, ERASER);
        assert_eq!(down, PointerOutcome::StrokeStarted(page(1)));
        tools.pointer_move(Point::ZERO, at(45.0, 25.0), &mut store, &pen(), ERASER);
        assert_eq!(tools.pointer_up(&mut store), PointerOutcome::Committed(page(1)));

        let surface = store.get(page(1)).expect("surface");
        assert_eq!(surface.snapshot_image(), Some(surface.canvas()));
        assert!(!surface.is_blank());
    }

    #[test]
    fn switching_tool_mid_stroke_discards_it() {
        let mut store = surfaces();
        let mut tools = ToolController::new(Tool::Draw);
        tools.pointer_down(Point::ZERO, at(5.0, 5.0), &mut store, ERASER);
        tools.pointer_move(Point::ZERO, at(45.0, 5.0), &mut store, &pen(), ERASER);
        tools.pointer_up(&mut store);
        let committed = store.get(page(1)).expect("surface").canvas().clone();

        tools.pointer_down(Point::ZERO, at(5.0, 40.0), &mut store, ERASER);
        tools.pointer_move(Point::ZERO, at(45.0, 40.0), &mut store, &pen(), ERASER);
        assert_eq!(tools.set_tool(Tool::Pan, &mut store), Some(page(1)));

        let surface = store.get(page(1)).expect("surface");
        assert_eq!(surface.canvas(), &committed);
        assert_eq!(surface.snapshot_image(), Some(&committed));
        assert_eq!(tools.active_page(), None);
    }

    #[test]
    fn pan_moves_coalesce_into_one_frame() {
        let mut store = surfaces();
        let mut tools = ToolController::new(Tool::Pan);
        tools.pointer_down(Point::new(100.0, 100.0), None, &mut store, ERASER);

        let first = tools.pointer_move(Point::new(100.0, 90.0), None, &mut store, &pen(), ERASER);
        let second = tools.pointer_move(Point::new(100.0, 70.0), None, &mut store, &pen(), ERASER);
        assert_eq!(first, PointerOutcome::FrameRequested);
        assert_eq!(second, PointerOutcome::Coalesced);

        assert_eq!(tools.take_frame_delta(), Some(Vec2::new(0.0, 30.0)));
        assert_eq!(tools.take_frame_delta(), None);
    }

    #[test]
    fn pointer_up_cancels_pending_pan_frame() {
        let mut store = surfaces();
        let mut tools = ToolController::new(Tool::Pan);
        tools.pointer_down(Point::new(0.0, 0.0), None, &mut store, ERASER);
        tools.pointer_move(Point::new(10.0, 0.0), None, &mut store, &pen(), ERASER);

        assert_eq!(tools.pointer_up(&mut store), PointerOutcome::PanEnded);
        assert!(!tools.is_frame_requested());
        assert_eq!(tools.take_frame_delta(), None);
    }

    #[test]
    fn erase_applies_on_pointer_down() {
        let mut store = surfaces();
        let mut tools = ToolController::new(Tool::Draw);
        tools.pointer_down(Point::ZERO, at(0.0, 25.0), &mut store, ERASER);
        tools.pointer_move(Point::ZERO, at(50.0, 25.0), &mut store, &pen(), ERASER);
        tools.pointer_up(&mut store);

        tools.set_tool(Tool::Erase, &mut store);
        let outcome = tools.pointer_down(Point::ZERO, at(25.0, 25.0), &mut store, ERASER);
        assert_eq!(outcome, PointerOutcome::Erased(page(1)));
        let canvas = store.get(page(1)).expect("surface").canvas();
        assert_eq!(canvas.get_pixel(25, 25).0[3], 0);
    }

    #[test]
    fn draw_without_surface_or_target_is_ignored() {
        let mut store = DrawingSurfaceStore::new();
        let mut tools = ToolController::new(Tool::Draw);
        assert_eq!(
            tools.pointer_down(Point::ZERO, at(1.0, 1.0), &mut store, ERASER),
            PointerOutcome::Ignored
        );
        assert_eq!(
            tools.pointer_down(Point::ZERO, None, &mut store, ERASER),
            PointerOutcome::Ignored
        );
        assert_eq!(tools.pointer_up(&mut store), PointerOutcome::Ignored);
    }

    #[test]
    fn select_reports_selection_end_only_on_pointer_up() {
        let mut store = surfaces();
        let mut tools = ToolController::default();
        assert_eq!(
            tools.pointer_down(Point::ZERO, None, &mut store, ERASER),
            PointerOutcome::SelectionStarted
        );
        assert_eq!(
            tools.pointer_move(Point::new(4.0, 4.0), None, &mut store, &pen(), ERASER),
            PointerOutcome::Ignored
        );
        assert_eq!(tools.pointer_up(&mut store), PointerOutcome::SelectionEnded);
    }
}
