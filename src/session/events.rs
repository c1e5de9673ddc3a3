use kurbo::Vec2;

use crate::page::{PageNumber, RasterSize};
use crate::pages::ScrollTarget;
use crate::view::{Rotation, ScrollMode};

/// Notifications for the host, drained with `ViewerSession::drain_events`.
///
/// None of these are errors. Conditions that do not end the session (a page
/// without text, a scroll that never found its geometry) are reported here
/// instead of through `EngineError`.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    PageRendered {
        page: PageNumber,
        size: RasterSize,
    },
    PageRenderFailed {
        page: PageNumber,
        message: String,
    },
    TextLayerMissing(PageNumber),
    TextExtractionFailed {
        page: PageNumber,
        message: String,
    },
    /// The host should scroll its container to `offset`.
    ScrollTo {
        target: ScrollTarget,
        offset: Vec2,
    },
    ScrollAbandoned(ScrollTarget),
    ScrollOffsetChanged(Vec2),
    CurrentPageChanged(PageNumber),
    TransformChanged {
        scale: f32,
        rotation: Rotation,
        scroll_mode: ScrollMode,
    },
    SearchUpdated {
        total: usize,
        current: Option<usize>,
    },
    /// A pan gesture wants one animation frame.
    FrameRequested,
    StrokeCommitted(PageNumber),
    StrokeDiscarded(PageNumber),
    SelectionEnded,
    AnnotationsChanged,
    DrawingsCleared,
}
