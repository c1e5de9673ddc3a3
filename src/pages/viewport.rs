use std::collections::HashMap;
use std::time::{Duration, Instant};

use kurbo::{Point, Rect, Size, Vec2};
use log::{debug, warn};

use crate::config::ViewportConfig;
use crate::page::PageNumber;
use crate::view::ScrollMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&ViewportConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &ViewportConfig) -> Self {
        Self {
            max_attempts: config.scroll_retry_attempts.max(1),
            delay: Duration::from_millis(config.scroll_retry_delay_ms.max(1)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollTarget {
    Page(PageNumber),
    /// A search match: scroll to its page, then to the match span itself.
    Match { page: PageNumber, match_index: usize },
}

impl ScrollTarget {
    pub fn page(self) -> PageNumber {
        match self {
            Self::Page(page) | Self::Match { page, .. } => page,
        }
    }
}

/// What a scroll request did. A match scroll first reports `Scrolled` with a
/// `ScrollTarget::Page` target for the page step while it stays pending for
/// the match span.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScrollResolution {
    Scrolled { target: ScrollTarget, offset: Vec2 },
    Abandoned(ScrollTarget),
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PendingScroll {
    target: ScrollTarget,
    attempts: u32,
    next_attempt_at: Instant,
    reached_page: bool,
}

/// Scroll position, current page and the geometry the host has laid out.
///
/// Page and match geometry only exist once the host has laid the page out, so
/// scroll requests are kept pending until the matching geometry is recorded.
/// If nothing arrives, `poll_pending` retries on a fixed delay and gives up
/// after the configured number of attempts.
#[derive(Debug)]
pub struct ViewportController {
    page_count: usize,
    current: PageNumber,
    scroll: Vec2,
    viewport: Size,
    scroll_mode: ScrollMode,
    page_layouts: HashMap<PageNumber, Rect>,
    match_spans: HashMap<usize, Rect>,
    pending: Option<PendingScroll>,
    retry: RetryPolicy,
    match_margin: f64,
}

impl ViewportController {
    pub fn new(page_count: usize, config: &ViewportConfig) -> Self {
        Self {
            page_count,
            current: PageNumber::FIRST,
            scroll: Vec2::ZERO,
            viewport: Size::ZERO,
            scroll_mode: ScrollMode::default(),
            page_layouts: HashMap::new(),
            match_spans: HashMap::new(),
            pending: None,
            retry: RetryPolicy::from_config(config),
            match_margin: f64::from(config.match_scroll_margin_px),
        }
    }

    pub fn current_page(&self) -> PageNumber {
        self.current
    }

    pub fn scroll_offset(&self) -> Vec2 {
        self.scroll
    }

    pub fn viewport_size(&self) -> Size {
        self.viewport
    }

    pub fn pending_target(&self) -> Option<ScrollTarget> {
        self.pending.map(|pending| pending.target)
    }

    pub fn page_layout(&self, page: PageNumber) -> Option<Rect> {
        self.page_layouts.get(&page).copied()
    }

    pub fn set_viewport_size(&mut self, size: Size) {
        self.viewport = size;
    }

    pub fn set_scroll_mode(&mut self, mode: ScrollMode) {
        self.scroll_mode = mode;
    }

    pub fn viewport_to_content(&self, point: Point) -> Point {
        point + self.scroll
    }

    /// Page whose laid-out box contains `content_point`.
    pub fn hit_test(&self, content_point: Point) -> Option<PageNumber> {
        self.page_layouts
            .iter()
            .filter(|(_, rect)| rect.contains(content_point))
            .map(|(page, _)| *page)
            .min()
    }

    /// Makes `requested` (clamped to the document) the current page and
    /// scrolls to it as soon as its geometry is known.
    pub fn scroll_to_page(&mut self, requested: i64, now: Instant) -> Option<ScrollResolution> {
        let page = PageNumber::clamped(requested, self.page_count)?;
        if i64::from(page.get()) != requested {
            debug!("clamped navigation from {requested} to page {page}");
        }
        self.request(ScrollTarget::Page(page), now)
    }

    pub fn scroll_to_match(
        &mut self,
        page: PageNumber,
        match_index: usize,
        now: Instant,
    ) -> Option<ScrollResolution> {
        if page.index() >= self.page_count {
            return None;
        }
        self.request(ScrollTarget::Match { page, match_index }, now)
    }

    pub fn cancel_pending(&mut self) {
        self.pending = None;
    }

    pub fn record_page_geometry(&mut self, page: PageNumber, layout: Rect) -> Option<ScrollResolution> {
        if page.index() >= self.page_count || layout.is_zero_area() {
            debug!("ignoring geometry for page {page}: {layout:?}");
            return None;
        }
        self.page_layouts.insert(page, layout);
        self.try_resolve()
    }

    pub fn record_match_geometry(&mut self, match_index: usize, span: Rect) -> Option<ScrollResolution> {
        self.match_spans.insert(match_index, span);
        self.try_resolve()
    }

    /// Forgets all recorded geometry. Called whenever the transform changes
    /// so stale boxes are never used for scrolling.
    pub fn invalidate_geometry(&mut self) {
        self.page_layouts.clear();
        self.match_spans.clear();
        if let Some(pending) = self.pending.as_mut() {
            pending.reached_page = false;
        }
    }

    pub fn clear_match_geometry(&mut self) {
        self.match_spans.clear();
    }

    /// Retries a pending scroll whose delay has elapsed.
    pub fn poll_pending(&mut self, now: Instant) -> Option<ScrollResolution> {
        let pending = self.pending?;
        if now < pending.next_attempt_at {
            return None;
        }
        if let Some(resolution) = self.try_resolve() {
            return Some(resolution);
        }

        let pending = self.pending.as_mut()?;
        pending.attempts += 1;
        if pending.attempts >= self.retry.max_attempts {
            let target = pending.target;
            self.pending = None;
            warn!(
                "giving up scroll to {target:?} after {} attempts",
                self.retry.max_attempts
            );
            return Some(ScrollResolution::Abandoned(target));
        }
        pending.next_attempt_at = now + self.retry.delay;
        None
    }

    /// Host scrolled. Updates the current page from the viewport centre and
    /// returns it when it changed.
    pub fn on_scroll(&mut self, offset: Vec2) -> Option<PageNumber> {
        self.scroll = Vec2::new(offset.x.max(0.0), offset.y.max(0.0));
        self.update_current_from_scroll()
    }

    pub fn scroll_by(&mut self, delta: Vec2) -> Option<PageNumber> {
        self.on_scroll(self.scroll + delta)
    }

    fn request(&mut self, target: ScrollTarget, now: Instant) -> Option<ScrollResolution> {
        self.current = target.page();
        self.pending = Some(PendingScroll {
            target,
            attempts: 0,
            next_attempt_at: now + self.retry.delay,
            reached_page: false,
        });
        self.try_resolve()
    }

    fn try_resolve(&mut self) -> Option<ScrollResolution> {
        let pending = self.pending?;
        let target = pending.target;
        let offset = match target {
            ScrollTarget::Page(page) => self.page_offset(page)?,
            ScrollTarget::Match { page, match_index } => {
                if let Some(span) = self.match_spans.get(&match_index) {
                    self.span_offset(*span)
                } else {
                    if pending.reached_page {
                        return None;
                    }
                    let offset = self.page_offset(page)?;
                    self.scroll = offset;
                    if let Some(pending) = self.pending.as_mut() {
                        pending.reached_page = true;
                    }
                    return Some(ScrollResolution::Scrolled {
                        target: ScrollTarget::Page(page),
                        offset,
                    });
                }
            }
        };
        self.pending = None;
        self.scroll = offset;
        self.current = target.page();
        Some(ScrollResolution::Scrolled { target, offset })
    }

    fn page_offset(&self, page: PageNumber) -> Option<Vec2> {
        let layout = self.page_layouts.get(&page)?;
        Some(match self.scroll_mode {
            ScrollMode::Horizontal => Vec2::new(layout.x0, self.scroll.y),
            ScrollMode::Vertical => Vec2::new(self.scroll.x, layout.y0),
            ScrollMode::Wrapped => Vec2::new(self.scroll.x, layout.y0),
        })
    }

    fn span_offset(&self, span: Rect) -> Vec2 {
        let x = match self.scroll_mode {
            ScrollMode::Horizontal => (span.x0 - self.match_margin).max(0.0),
            ScrollMode::Vertical | ScrollMode::Wrapped => self.scroll.x,
        };
        Vec2::new(x, (span.y0 - self.match_margin).max(0.0))
    }

    fn update_current_from_scroll(&mut self) -> Option<PageNumber> {
        let center = Point::new(
            self.scroll.x + self.viewport.width / 2.0,
            self.scroll.y + self.viewport.height / 2.0,
        );
        let page = self.hit_test(center).or_else(|| {
            self.page_layouts
                .iter()
                .min_by(|(_, left), (_, right)| {
                    distance_sq(left.center(), center).total_cmp(&distance_sq(right.center(), center))
                })
                .map(|(page, _)| *page)
        })?;
        if page == self.current {
            return None;
        }
        self.current = page;
        Some(page)
    }
}

fn distance_sq(a: Point, b: Point) -> f64 {
    (a - b).hypot2()
}
