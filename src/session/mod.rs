mod events;

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use kurbo::{Point, Rect, Size, Vec2};
use log::{debug, info, warn};

pub use events::SessionEvent;

use crate::annotations::{AnnotationId, AnnotationStore, TextSelection};
use crate::backend::{
    DocumentLoader, HayroLoader, PageDecoder, RgbaFrame, TextFragment, read_document_bytes,
};
use crate::config::Config;
use crate::deeplink::DeepLink;
use crate::drawing::{DrawingSurfaceStore, Pen};
use crate::error::{EngineError, EngineResult};
use crate::page::{PageNumber, RasterSize};
use crate::pages::{PageRegistry, ScrollResolution, TextLayerStatus, ViewportController};
use crate::render::{RasterCache, RasterKey, RenderQueue};
use crate::search::{SearchEngine, SearchMatch};
use crate::text::{ExtractionEvent, PageText, PageTextLayer, TextExtractor, TextIndex};
use crate::tool::{PagePoint, PointerOutcome, Tool, ToolController};
use crate::view::{PageMapping, ScrollMode, ViewTransform};

enum TextSource {
    /// Extraction runs on the background worker; results arrive in `pump`.
    Worker(TextExtractor),
    /// Extraction runs inline right after a page renders.
    Inline,
}

/// One open document and every piece of view state derived from it.
///
/// Created when a document loads and dropped when it closes. All methods run
/// on the interaction thread; the only background work is text extraction.
pub struct ViewerSession {
    config: Config,
    decoder: Box<dyn PageDecoder>,
    text_source: TextSource,
    transform: ViewTransform,
    registry: PageRegistry,
    viewport: ViewportController,
    tools: ToolController,
    surfaces: DrawingSurfaceStore,
    text_index: TextIndex,
    search: SearchEngine,
    annotations: AnnotationStore,
    rasters: RasterCache,
    render_queue: RenderQueue,
    pen: Pen,
    events: VecDeque<SessionEvent>,
}

impl ViewerSession {
    /// Loads `bytes` and starts a background text extractor over them.
    pub fn open(
        bytes: Arc<Vec<u8>>,
        loader: Arc<dyn DocumentLoader>,
        config: Config,
    ) -> EngineResult<Self> {
        let decoder = loader.load(Arc::clone(&bytes))?;
        let extractor = TextExtractor::spawn(loader, bytes)?;
        Self::build(decoder, TextSource::Worker(extractor), config)
    }

    pub fn open_path(path: impl AsRef<Path>, config: Config) -> EngineResult<Self> {
        let bytes = read_document_bytes(path)?;
        Self::open(bytes, Arc::new(HayroLoader), config)
    }

    /// Session over an already opened decoder. Text is extracted inline.
    pub fn with_decoder(decoder: Box<dyn PageDecoder>, config: Config) -> EngineResult<Self> {
        Self::build(decoder, TextSource::Inline, config)
    }

    fn build(decoder: Box<dyn PageDecoder>, text_source: TextSource, config: Config) -> EngineResult<Self> {
        let page_count = decoder.page_count();
        if page_count == 0 {
            return Err(EngineError::document_load("document has no pages"));
        }
        info!("opened document with {page_count} pages");

        let mut session = Self {
            viewport: ViewportController::new(page_count, &config.viewport),
            registry: PageRegistry::new(page_count),
            rasters: RasterCache::new(
                config.cache.raster_max_entries,
                config.cache.raster_memory_budget_bytes(),
            ),
            pen: Pen::from_config(&config.drawing),
            config,
            decoder,
            text_source,
            transform: ViewTransform::default(),
            tools: ToolController::default(),
            surfaces: DrawingSurfaceStore::new(),
            text_index: TextIndex::new(),
            search: SearchEngine::new(),
            annotations: AnnotationStore::new(),
            render_queue: RenderQueue::new(),
            events: VecDeque::new(),
        };
        session.refresh_window();
        Ok(session)
    }

    pub fn page_count(&self) -> usize {
        self.registry.page_count()
    }

    pub fn current_page(&self) -> PageNumber {
        self.viewport.current_page()
    }

    pub fn transform(&self) -> &ViewTransform {
        &self.transform
    }

    pub fn tool(&self) -> Tool {
        self.tools.tool()
    }

    pub fn registry(&self) -> &PageRegistry {
        &self.registry
    }

    pub fn viewport(&self) -> &ViewportController {
        &self.viewport
    }

    pub fn surfaces(&self) -> &DrawingSurfaceStore {
        &self.surfaces
    }

    pub fn annotations(&self) -> &AnnotationStore {
        &self.annotations
    }

    pub fn text_index(&self) -> &TextIndex {
        &self.text_index
    }

    pub fn search_matches(&self) -> &[SearchMatch] {
        self.search.matches()
    }

    pub fn current_match(&self) -> Option<&SearchMatch> {
        self.search.current_match()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        self.events.drain(..).collect()
    }

    // ---- window and rendering ----

    /// Recomputes the materialization window and queues renders for pages in
    /// it that are not rendered yet. Returns the window.
    pub fn refresh_window(&mut self) -> Vec<PageNumber> {
        let current = self.viewport.current_page();
        let buffer = self.config.viewport.page_buffer;
        let window =
            self.registry
                .materialization_window(current, buffer, self.search.match_pages());
        self.registry.apply_window(&window);
        let registry = &self.registry;
        self.render_queue
            .plan(current, buffer, &window, |page| registry.is_rendered(page));
        window
    }

    /// Renders up to `limit` queued pages, current page first. Returns the
    /// pages that rendered.
    pub fn render_pending(&mut self, limit: usize) -> Vec<PageNumber> {
        let mut rendered = Vec::new();
        while rendered.len() < limit {
            let Some(request) = self.render_queue.pop_next() else {
                break;
            };
            if self.render_page(request.page).is_some() {
                rendered.push(request.page);
            }
        }
        rendered
    }

    /// Renders every queued page.
    pub fn render_window(&mut self) -> Vec<PageNumber> {
        self.refresh_window();
        self.render_pending(usize::MAX)
    }

    pub fn raster(&self, page: PageNumber) -> Option<&RgbaFrame> {
        self.rasters.peek(&self.raster_key(page))
    }

    fn render_page(&mut self, page: PageNumber) -> Option<RasterSize> {
        let key = self.raster_key(page);
        let cached = self.rasters.get(&key).map(RgbaFrame::size);
        let size = match cached {
            Some(size) => size,
            None => {
                let rendered = self.decoder.render_page(
                    page,
                    self.transform.scale(),
                    self.transform.rotation(),
                );
                let frame = match rendered {
                    Ok(frame) => frame,
                    Err(err) => {
                        warn!("render failed for page {page}: {err}");
                        self.events.push_back(SessionEvent::PageRenderFailed {
                            page,
                            message: err.to_string(),
                        });
                        return None;
                    }
                };
                let size = frame.size();
                let is_current = page == self.viewport.current_page();
                if !self.rasters.insert(key, frame, is_current) {
                    debug!("raster for page {page} exceeds the cache budget");
                }
                size
            }
        };
        self.on_page_render_success(page, size);
        Some(size)
    }

    /// Marks `page` rendered at `size`, resizes its drawing surface if it has
    /// one and, the first time only, requests its text. Surfaces themselves
    /// are created on the first stroke.
    pub fn on_page_render_success(&mut self, page: PageNumber, size: RasterSize) {
        if !self.registry.mark_rendered(page) {
            return;
        }
        if self.surfaces.contains(page) {
            self.surfaces.initialize(page, size);
        }
        self.events
            .push_back(SessionEvent::PageRendered { page, size });
        if self.registry.has_text(page) {
            return;
        }

        if let TextSource::Worker(extractor) = &mut self.text_source {
            if let Err(err) = extractor.request(page) {
                warn!("text extraction unavailable for page {page}: {err}");
            }
            return;
        }
        match self.decoder.text_fragments(page) {
            Ok(fragments) => self.apply_text(page, &fragments),
            Err(err) => self.text_failed(page, err.to_string()),
        }
    }

    pub fn on_thumbnail_rendered(&mut self, page: PageNumber) {
        self.registry.mark_thumbnail_rendered(page);
    }

    /// Applies background results and retries pending scrolls. Call it from
    /// the host's event loop.
    pub fn pump(&mut self, now: Instant) {
        let extracted = match &mut self.text_source {
            TextSource::Worker(extractor) => extractor.drain_events(),
            TextSource::Inline => Vec::new(),
        };
        for event in extracted {
            match event {
                ExtractionEvent::Extracted { page, fragments } => self.apply_text(page, &fragments),
                ExtractionEvent::Failed { page, message } => self.text_failed(page, message),
            }
        }

        if let Some(resolution) = self.viewport.poll_pending(now) {
            self.emit_resolution(resolution);
        }
    }

    pub fn has_pending_text(&self) -> bool {
        match &self.text_source {
            TextSource::Worker(extractor) => extractor.has_pending(),
            TextSource::Inline => false,
        }
    }

    fn apply_text(&mut self, page: PageNumber, fragments: &[TextFragment]) {
        let page_text = PageText::from_fragments(fragments);
        match self
            .registry
            .store_text(page, page_text.text().to_string())
        {
            TextLayerStatus::Stored => {
                self.text_index.insert(page, page_text);
            }
            TextLayerStatus::Missing => {
                warn!("page {page} has no text layer");
                self.events.push_back(SessionEvent::TextLayerMissing(page));
            }
            TextLayerStatus::AlreadyExtracted | TextLayerStatus::OutOfRange => return,
        }

        if self.search.refresh(&self.text_index) {
            self.emit_search_updated();
            self.refresh_window();
        }
    }

    fn text_failed(&mut self, page: PageNumber, message: String) {
        warn!("text extraction failed for page {page}: {message}");
        self.events
            .push_back(SessionEvent::TextExtractionFailed { page, message });
    }

    fn raster_key(&self, page: PageNumber) -> RasterKey {
        RasterKey::new(page, self.transform.scale(), self.transform.rotation())
    }

    // ---- view transform ----

    pub fn zoom_in(&mut self) -> bool {
        let changed = self.transform.zoom_in();
        self.after_transform(changed)
    }

    pub fn zoom_out(&mut self) -> bool {
        let changed = self.transform.zoom_out();
        self.after_transform(changed)
    }

    pub fn set_scale(&mut self, value: f32) -> bool {
        let changed = self.transform.set_scale(value);
        self.after_transform(changed)
    }

    pub fn rotate_clockwise(&mut self) -> bool {
        let changed = self.transform.rotate_clockwise();
        self.after_transform(changed)
    }

    pub fn rotate_counterclockwise(&mut self) -> bool {
        let changed = self.transform.rotate_counterclockwise();
        self.after_transform(changed)
    }

    pub fn set_rotation(&mut self, degrees: i32) -> bool {
        let changed = self.transform.set_rotation(degrees);
        self.after_transform(changed)
    }

    pub fn set_scroll_mode(&mut self, mode: ScrollMode) -> bool {
        let changed = self.transform.set_scroll_mode(mode);
        if changed {
            self.viewport.set_scroll_mode(mode);
        }
        self.after_transform(changed)
    }

    pub fn reset_transform(&mut self) -> bool {
        let before = self.transform;
        self.transform.reset();
        let changed = before != self.transform;
        self.after_transform(changed)
    }

    // Rasters and layout geometry are stale after any transform change.
    // Drawing content is untouched; surfaces resize when pages re-render.
    fn after_transform(&mut self, changed: bool) -> bool {
        if !changed {
            return false;
        }
        if let Some(page) = self.tools.set_tool(self.tools.tool(), &mut self.surfaces) {
            self.events.push_back(SessionEvent::StrokeDiscarded(page));
        }
        let current_key = self.raster_key(self.viewport.current_page());
        self.rasters.retain_transform(&current_key);
        self.registry.invalidate_rasters();
        self.viewport.invalidate_geometry();
        self.events.push_back(SessionEvent::TransformChanged {
            scale: self.transform.scale(),
            rotation: self.transform.rotation(),
            scroll_mode: self.transform.scroll_mode(),
        });
        self.refresh_window();
        true
    }

    // ---- navigation and geometry ----

    pub fn set_viewport_size(&mut self, size: Size) {
        self.viewport.set_viewport_size(size);
    }

    /// Navigates to `requested`, clamped into the document.
    pub fn go_to_page(&mut self, requested: i64) {
        let before = self.viewport.current_page();
        let resolution = self.viewport.scroll_to_page(requested, Instant::now());
        self.after_navigation(before);
        if let Some(resolution) = resolution {
            self.emit_resolution(resolution);
        }
    }

    /// The host scrolled its container.
    pub fn on_scroll(&mut self, offset: Vec2) {
        if let Some(page) = self.viewport.on_scroll(offset) {
            self.events.push_back(SessionEvent::CurrentPageChanged(page));
            self.refresh_window();
        }
    }

    pub fn record_page_geometry(&mut self, page: PageNumber, layout: Rect) {
        if let Some(resolution) = self.viewport.record_page_geometry(page, layout) {
            self.emit_resolution(resolution);
        }
    }

    pub fn record_match_geometry(&mut self, match_index: usize, span: Rect) {
        if let Some(resolution) = self.viewport.record_match_geometry(match_index, span) {
            self.emit_resolution(resolution);
        }
    }

    fn after_navigation(&mut self, before: PageNumber) {
        let current = self.viewport.current_page();
        if current != before {
            self.events
                .push_back(SessionEvent::CurrentPageChanged(current));
        }
        self.refresh_window();
    }

    fn emit_resolution(&mut self, resolution: ScrollResolution) {
        match resolution {
            ScrollResolution::Scrolled { target, offset } => {
                self.events
                    .push_back(SessionEvent::ScrollTo { target, offset });
            }
            ScrollResolution::Abandoned(target) => {
                self.events.push_back(SessionEvent::ScrollAbandoned(target));
            }
        }
    }

    // ---- search ----

    /// Searches with the configured case and highlight defaults.
    pub fn search_default(&mut self, query: &str) -> usize {
        let match_case = self.config.search.match_case;
        let highlight_all = self.config.search.highlight_all;
        self.search(query, match_case, highlight_all)
    }

    /// Runs a search over all extracted text and scrolls to the first match.
    /// Returns the number of matches.
    pub fn search(&mut self, query: &str, match_case: bool, highlight_all: bool) -> usize {
        self.viewport.clear_match_geometry();
        let first = self
            .search
            .search(&self.text_index, query, match_case, highlight_all)
            .map(|found| (found.page, found.match_index));
        self.emit_search_updated();
        match first {
            Some((page, match_index)) => self.scroll_to_match(page, match_index),
            None => {
                self.refresh_window();
            }
        }
        self.search.matches().len()
    }

    pub fn go_to_next_match(&mut self) -> bool {
        let next = self
            .search
            .go_to_next_match()
            .map(|found| (found.page, found.match_index));
        self.after_match_step(next)
    }

    pub fn go_to_previous_match(&mut self) -> bool {
        let previous = self
            .search
            .go_to_previous_match()
            .map(|found| (found.page, found.match_index));
        self.after_match_step(previous)
    }

    pub fn clear_search(&mut self) {
        self.search.clear();
        self.viewport.clear_match_geometry();
        self.emit_search_updated();
        self.refresh_window();
    }

    fn after_match_step(&mut self, step: Option<(PageNumber, usize)>) -> bool {
        let Some((page, match_index)) = step else {
            return false;
        };
        self.emit_search_updated();
        self.scroll_to_match(page, match_index);
        true
    }

    fn scroll_to_match(&mut self, page: PageNumber, match_index: usize) {
        let before = self.viewport.current_page();
        let resolution = self
            .viewport
            .scroll_to_match(page, match_index, Instant::now());
        self.after_navigation(before);
        if let Some(resolution) = resolution {
            self.emit_resolution(resolution);
        }
    }

    fn emit_search_updated(&mut self) {
        let total = self.search.matches().len();
        let current = (total > 0).then(|| self.search.current_index());
        self.events
            .push_back(SessionEvent::SearchUpdated { total, current });
    }

    /// Text overlay for `page` with search highlights and annotation marks.
    /// `None` until the page's text has been extracted.
    pub fn page_text_layer(&self, page: PageNumber) -> Option<PageTextLayer> {
        let text = self.text_index.get(page)?;
        let highlights = self.search.highlights_for_page(page);
        Some(PageTextLayer::build(
            page,
            text,
            &highlights,
            &self.annotations,
        ))
    }

    // ---- annotations ----

    pub fn add_note(&mut self, selection: &TextSelection, note: &str) -> Option<AnnotationId> {
        let id = self.annotations.add_note(selection, note)?;
        self.events.push_back(SessionEvent::AnnotationsChanged);
        Some(id)
    }

    pub fn remove_annotation(&mut self, id: AnnotationId) -> bool {
        if self.annotations.remove(id).is_none() {
            debug!("no annotation {id} to remove");
            return false;
        }
        self.events.push_back(SessionEvent::AnnotationsChanged);
        true
    }

    pub fn clear_all_annotations(&mut self) {
        if self.annotations.clear_all() > 0 {
            self.events.push_back(SessionEvent::AnnotationsChanged);
        }
    }

    /// Annotation ids marking the fragment at `fragment_index` on `page`.
    pub fn annotations_at(&self, page: PageNumber, fragment_index: usize) -> Vec<AnnotationId> {
        let Some(text) = self
            .text_index
            .get(page)
            .and_then(|text| text.fragment_text(fragment_index))
        else {
            return Vec::new();
        };
        self.annotations.ids_at_fragment(page, text)
    }

    pub fn export_annotations(&self) -> EngineResult<String> {
        self.annotations.to_json()
    }

    /// Replaces all annotations with those in `raw`. Annotations for pages the
    /// document does not have are dropped.
    pub fn import_annotations(&mut self, raw: &str) -> EngineResult<usize> {
        let imported = AnnotationStore::from_json(raw)?;
        let mut store = AnnotationStore::new();
        for annotation in imported.all() {
            if !self.registry.contains_page(annotation.page) {
                debug!("dropping imported annotation for missing page {}", annotation.page);
                continue;
            }
            store.restore(annotation.clone());
        }
        let count = store.len();
        self.annotations = store;
        self.events.push_back(SessionEvent::AnnotationsChanged);
        Ok(count)
    }

    // ---- tools and drawing ----

    pub fn set_tool(&mut self, tool: Tool) {
        if let Some(page) = self.tools.set_tool(tool, &mut self.surfaces) {
            self.events.push_back(SessionEvent::StrokeDiscarded(page));
        }
    }

    pub fn clear_all_drawings(&mut self) {
        self.tools.set_tool(self.tools.tool(), &mut self.surfaces);
        self.surfaces.clear_all();
        self.events.push_back(SessionEvent::DrawingsCleared);
    }

    /// Pointer pressed at `point` in viewport coordinates.
    pub fn pointer_down(&mut self, point: Point) -> PointerOutcome {
        let target = self.hit_page(point);
        if self.tools.tool().edits_surface()
            && let Some(target) = target
            && let Some(size) = self.expected_raster_size(target.page)
        {
            self.surfaces.initialize(target.page, size);
        }
        let outcome = self.tools.pointer_down(
            point,
            target,
            &mut self.surfaces,
            self.config.drawing.eraser_radius,
        );
        self.emit_pointer(outcome);
        outcome
    }

    pub fn pointer_move(&mut self, point: Point) -> PointerOutcome {
        let target = match self.tools.active_page() {
            Some(page) => self.map_to_page(page, point),
            None => None,
        };
        let outcome = self.tools.pointer_move(
            point,
            target,
            &mut self.surfaces,
            &self.pen,
            self.config.drawing.eraser_radius,
        );
        self.emit_pointer(outcome);
        outcome
    }

    pub fn pointer_up(&mut self) -> PointerOutcome {
        let outcome = self.tools.pointer_up(&mut self.surfaces);
        self.emit_pointer(outcome);
        outcome
    }

    /// Applies the pan delta accumulated since the last frame request.
    pub fn on_animation_frame(&mut self) -> Option<Vec2> {
        let delta = self.tools.take_frame_delta()?;
        let changed = self.viewport.scroll_by(delta);
        let offset = self.viewport.scroll_offset();
        self.events
            .push_back(SessionEvent::ScrollOffsetChanged(offset));
        if let Some(page) = changed {
            self.events.push_back(SessionEvent::CurrentPageChanged(page));
            self.refresh_window();
        }
        Some(offset)
    }

    fn emit_pointer(&mut self, outcome: PointerOutcome) {
        let event = match outcome {
            PointerOutcome::FrameRequested => SessionEvent::FrameRequested,
            PointerOutcome::Committed(page) => SessionEvent::StrokeCommitted(page),
            PointerOutcome::SelectionEnded => SessionEvent::SelectionEnded,
            _ => return,
        };
        self.events.push_back(event);
    }

    fn hit_page(&self, point: Point) -> Option<PagePoint> {
        let content = self.viewport.viewport_to_content(point);
        let page = self.viewport.hit_test(content)?;
        self.map_to_page(page, point)
    }

    fn map_to_page(&self, page: PageNumber, point: Point) -> Option<PagePoint> {
        let mapping = self.page_mapping(page)?;
        let content = self.viewport.viewport_to_content(point);
        Some(PagePoint::new(page, mapping.to_raster(content)))
    }

    fn page_mapping(&self, page: PageNumber) -> Option<PageMapping> {
        let layout = self.viewport.page_layout(page)?;
        let raster = self.expected_raster_size(page)?;
        PageMapping::new(layout, raster)
    }

    /// Raster size of `page` at the current transform: the cached raster if
    /// there is one, otherwise the page size scaled and rotated.
    fn expected_raster_size(&self, page: PageNumber) -> Option<RasterSize> {
        if let Some(frame) = self.raster(page) {
            return Some(frame.size());
        }
        let (width, height) = self.decoder.page_dimensions(page).ok()?;
        let scale = self.transform.scale();
        let width = (width * scale).round().max(1.0) as u32;
        let height = (height * scale).round().max(1.0) as u32;
        Some(if self.transform.rotation().is_quarter_turn() {
            RasterSize::new(height, width)
        } else {
            RasterSize::new(width, height)
        })
    }

    // ---- deep links ----

    /// Applies a link's query string. Invalid parameters are ignored.
    pub fn apply_deep_link(&mut self, query: &str) -> DeepLink {
        let link = DeepLink::parse(query);
        if let Some(scale) = link.scale {
            self.set_scale(scale);
        }
        if let Some(rotation) = link.rotation {
            self.set_rotation(i32::from(rotation.degrees()));
        }
        if let Some(page) = link.page {
            self.go_to_page(page);
        }
        if let Some(scroll) = link.scroll {
            self.viewport.cancel_pending();
            let offset = Vec2::new(self.viewport.scroll_offset().x, scroll);
            self.on_scroll(offset);
            self.events
                .push_back(SessionEvent::ScrollOffsetChanged(self.viewport.scroll_offset()));
        }
        link
    }

    pub fn current_deep_link(&self) -> DeepLink {
        DeepLink {
            page: Some(i64::from(self.current_page().get())),
            scroll: Some(self.viewport.scroll_offset().y),
            scale: Some(self.transform.scale()),
            rotation: Some(self.transform.rotation()),
        }
    }
}
