use std::collections::HashSet;
use std::sync::Arc;

use log::{debug, warn};
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::sync::mpsc::{
    UnboundedReceiver, UnboundedSender, error::TryRecvError, unbounded_channel,
};
use tokio::task::JoinHandle;

use crate::backend::{DocumentLoader, PageDecoder, TextFragment};
use crate::error::{EngineError, EngineResult};
use crate::page::PageNumber;

#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionEvent {
    Extracted {
        page: PageNumber,
        fragments: Vec<TextFragment>,
    },
    Failed {
        page: PageNumber,
        message: String,
    },
}

impl ExtractionEvent {
    pub fn page(&self) -> PageNumber {
        match self {
            Self::Extracted { page, .. } | Self::Failed { page, .. } => *page,
        }
    }
}

enum WorkerRequest {
    Extract(PageNumber),
    Shutdown,
}

/// Background text extraction.
///
/// The worker opens its own decoder over the same document bytes, so the
/// interaction thread keeps exclusive use of the rendering decoder. Results
/// are only observed through `drain_events`; until then a page counts as
/// having no text.
pub struct TextExtractor {
    request_tx: UnboundedSender<WorkerRequest>,
    event_rx: UnboundedReceiver<ExtractionEvent>,
    in_flight: HashSet<PageNumber>,
    _runtime: ExtractorRuntime,
    worker: Option<JoinHandle<()>>,
}

struct ExtractorRuntime {
    _owned: Option<Runtime>,
    handle: Handle,
}

impl ExtractorRuntime {
    fn new() -> EngineResult<Self> {
        if let Ok(handle) = Handle::try_current() {
            return Ok(Self {
                _owned: None,
                handle,
            });
        }

        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .thread_name("pdf-ink-text")
            .build()
            .map_err(|err| {
                EngineError::io_with_context(err, "failed to start text extraction runtime")
            })?;
        let handle = runtime.handle().clone();
        Ok(Self {
            _owned: Some(runtime),
            handle,
        })
    }

    fn spawn_blocking<F>(&self, task: F) -> JoinHandle<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.handle.spawn_blocking(task)
    }
}

impl TextExtractor {
    pub fn spawn(loader: Arc<dyn DocumentLoader>, bytes: Arc<Vec<u8>>) -> EngineResult<Self> {
        let (request_tx, request_rx) = unbounded_channel();
        let (event_tx, event_rx) = unbounded_channel();
        let runtime = ExtractorRuntime::new()?;
        let worker =
            runtime.spawn_blocking(move || worker_main(request_rx, event_tx, loader, bytes));

        Ok(Self {
            request_tx,
            event_rx,
            in_flight: HashSet::new(),
            _runtime: runtime,
            worker: Some(worker),
        })
    }

    /// Queues `page` unless it is already being extracted.
    pub fn request(&mut self, page: PageNumber) -> EngineResult<bool> {
        if !self.in_flight.insert(page) {
            return Ok(false);
        }
        if self.request_tx.send(WorkerRequest::Extract(page)).is_err() {
            self.in_flight.remove(&page);
            return Err(EngineError::unsupported(
                "text extraction worker is not available",
            ));
        }
        Ok(true)
    }

    pub fn is_pending(&self, page: PageNumber) -> bool {
        self.in_flight.contains(&page)
    }

    pub fn has_pending(&self) -> bool {
        !self.in_flight.is_empty()
    }

    /// Collects finished pages. If the worker has gone away, every page still
    /// in flight is reported as failed so nothing stays pending forever.
    pub fn drain_events(&mut self) -> Vec<ExtractionEvent> {
        let mut drained = Vec::new();
        loop {
            match self.event_rx.try_recv() {
                Ok(event) => {
                    self.in_flight.remove(&event.page());
                    drained.push(event);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    let mut stuck: Vec<PageNumber> = self.in_flight.drain().collect();
                    stuck.sort_unstable();
                    if !stuck.is_empty() {
                        warn!("text extraction worker stopped with {} pages pending", stuck.len());
                    }
                    drained.extend(stuck.into_iter().map(|page| ExtractionEvent::Failed {
                        page,
                        message: "text extraction worker stopped".to_string(),
                    }));
                    break;
                }
            }
        }
        drained
    }
}

impl Drop for TextExtractor {
    fn drop(&mut self) {
        let _ = self.request_tx.send(WorkerRequest::Shutdown);
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }
}

fn worker_main(
    mut request_rx: UnboundedReceiver<WorkerRequest>,
    event_tx: UnboundedSender<ExtractionEvent>,
    loader: Arc<dyn DocumentLoader>,
    bytes: Arc<Vec<u8>>,
) {
    let mut decoder: Option<Box<dyn PageDecoder>> = None;

    while let Some(WorkerRequest::Extract(page)) = request_rx.blocking_recv() {
        if decoder.is_none() {
            match loader.load(Arc::clone(&bytes)) {
                Ok(loaded) => decoder = Some(loaded),
                Err(err) => {
                    warn!("text worker could not open document: {err}");
                    let _ = event_tx.send(ExtractionEvent::Failed {
                        page,
                        message: err.to_string(),
                    });
                    continue;
                }
            }
        }
        let Some(doc) = decoder.as_deref() else {
            continue;
        };

        let event = match doc.text_fragments(page) {
            Ok(fragments) => {
                debug!("extracted {} fragments from page {page}", fragments.len());
                ExtractionEvent::Extracted { page, fragments }
            }
            Err(err) => ExtractionEvent::Failed {
                page,
                message: err.to_string(),
            },
        };
        if event_tx.send(event).is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    use crate::backend::{DocumentLoader, PageDecoder, RgbaFrame, TextFragment};
    use crate::error::{EngineError, EngineResult};
    use crate::page::PageNumber;
    use crate::test_support::{StubDecoder, StubLoader, page};
    use crate::view::Rotation;

    use super::{ExtractionEvent, TextExtractor};

    fn wait_for_events(extractor: &mut TextExtractor, count: usize) -> Vec<ExtractionEvent> {
        let timeout = Duration::from_secs(3);
        let start = Instant::now();
        let mut events = Vec::new();
        while events.len() < count {
            events.extend(extractor.drain_events());
            assert!(
                start.elapsed() <= timeout,
                "timed out waiting for extraction"
            );
            thread::sleep(Duration::from_millis(5));
        }
        events
    }

    fn extractor(decoder: StubDecoder) -> TextExtractor {
        TextExtractor::spawn(Arc::new(StubLoader { decoder }), Arc::new(Vec::new()))
            .expect("extractor should start")
    }

    #[test]
    fn extracts_requested_pages_in_order() {
        let mut extractor = extractor(StubDecoder::with_texts(&["one", "two"]));
        assert!(extractor.request(page(2)).expect("request"));
        assert!(extractor.request(page(1)).expect("request"));

        let events = wait_for_events(&mut extractor, 2);
        let pages: Vec<u32> = events.iter().map(|event| event.page().get()).collect();
        assert_eq!(pages, vec![2, 1]);
        assert!(matches!(
            &events[0],
            ExtractionEvent::Extracted { fragments, .. } if fragments[0].text == "two"
        ));
        assert!(!extractor.has_pending());
    }

    #[test]
    fn duplicate_requests_are_coalesced_while_in_flight() {
        let mut extractor = extractor(StubDecoder::with_texts(&["one"]));
        assert!(extractor.request(page(1)).expect("request"));
        assert!(!extractor.request(page(1)).expect("request"));
        assert!(extractor.is_pending(page(1)));

        let events = wait_for_events(&mut extractor, 1);
        assert_eq!(events.len(), 1);
        assert!(!extractor.is_pending(page(1)));
    }

    #[derive(Debug)]
    struct PanickingDecoder;

    impl PageDecoder for PanickingDecoder {
        fn page_count(&self) -> usize {
            2
        }

        fn page_dimensions(&self, _page: PageNumber) -> EngineResult<(f32, f32)> {
            Ok((100.0, 100.0))
        }

        fn render_page(
            &self,
            page: PageNumber,
            _scale: f32,
            _rotation: Rotation,
        ) -> EngineResult<RgbaFrame> {
            Err(EngineError::unsupported(format!("no raster for page {page}")))
        }

        fn text_fragments(&self, _page: PageNumber) -> EngineResult<Vec<TextFragment>> {
            panic!("decoder crashed");
        }
    }

    struct PanickingLoader;

    impl DocumentLoader for PanickingLoader {
        fn load(&self, _bytes: Arc<Vec<u8>>) -> EngineResult<Box<dyn PageDecoder>> {
            Ok(Box::new(PanickingDecoder))
        }
    }

    #[test]
    fn crashed_worker_fails_pending_pages() {
        let mut extractor = TextExtractor::spawn(Arc::new(PanickingLoader), Arc::new(Vec::new()))
            .expect("extractor should start");
        extractor.request(page(1)).expect("request");

        let events = wait_for_events(&mut extractor, 1);
        assert!(matches!(&events[0], ExtractionEvent::Failed { page: failed, .. } if failed.get() == 1));
        assert!(!extractor.has_pending());

        let start = Instant::now();
        while extractor.request(page(2)).is_ok() {
            extractor.drain_events();
            assert!(
                start.elapsed() <= Duration::from_secs(3),
                "worker should have stopped"
            );
            thread::sleep(Duration::from_millis(5));
        }
        assert!(!extractor.is_pending(page(2)));
    }

    #[test]
    fn decoder_errors_become_failed_events() {
        let mut decoder = StubDecoder::with_texts(&["one", "two"]);
        decoder.failing_pages.insert(1, "broken content stream".to_string());
        let mut extractor = extractor(decoder);
        extractor.request(page(2)).expect("request");

        let events = wait_for_events(&mut extractor, 1);
        assert!(matches!(&events[0], ExtractionEvent::Failed { page: failed, .. } if failed.get() == 2));
    }
}
