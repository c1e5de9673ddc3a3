use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use crate::page::PageNumber;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderClass {
    CurrentPage,
    Window,
    SearchMatch,
}

impl RenderClass {
    fn rank(self) -> u8 {
        match self {
            Self::CurrentPage => 3,
            Self::Window => 2,
            Self::SearchMatch => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderRequest {
    pub page: PageNumber,
    pub class: RenderClass,
    /// Pages between this one and the current page.
    pub distance: u32,
}

#[derive(Debug)]
struct Queued {
    request: RenderRequest,
    ordinal: u64,
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Queued {}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Queued {
    fn cmp(&self, other: &Self) -> Ordering {
        self.request
            .class
            .rank()
            .cmp(&other.request.class.rank())
            .then(other.request.distance.cmp(&self.request.distance))
            .then(other.ordinal.cmp(&self.ordinal))
    }
}

/// Pending page renders, current page first, then the buffer window nearest
/// first, then pages that only hold search matches. Each page is queued at
/// most once.
#[derive(Debug, Default)]
pub struct RenderQueue {
    tasks: BinaryHeap<Queued>,
    queued_pages: HashSet<PageNumber>,
    next_ordinal: u64,
}

impl RenderQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the queue with requests for `window`, skipping pages for
    /// which `is_ready` holds. Window pages further than `buffer` from the
    /// current page are only there because they hold search matches. Returns
    /// how many requests were queued.
    pub fn plan(
        &mut self,
        current: PageNumber,
        buffer: u32,
        window: &[PageNumber],
        is_ready: impl Fn(PageNumber) -> bool,
    ) -> usize {
        self.clear();
        for &page in window {
            if is_ready(page) {
                continue;
            }
            let distance = page.get().abs_diff(current.get());
            let class = if page == current {
                RenderClass::CurrentPage
            } else if distance > buffer {
                RenderClass::SearchMatch
            } else {
                RenderClass::Window
            };
            self.push(RenderRequest {
                page,
                class,
                distance,
            });
        }
        self.len()
    }

    pub fn push(&mut self, request: RenderRequest) -> bool {
        if !self.queued_pages.insert(request.page) {
            return false;
        }
        self.tasks.push(Queued {
            request,
            ordinal: self.next_ordinal,
        });
        self.next_ordinal = self.next_ordinal.saturating_add(1);
        true
    }

    pub fn pop_next(&mut self) -> Option<RenderRequest> {
        let item = self.tasks.pop()?;
        self.queued_pages.remove(&item.request.page);
        Some(item.request)
    }

    /// Keeps only requests whose page satisfies `keep`.
    pub fn retain_pages(&mut self, mut keep: impl FnMut(PageNumber) -> bool) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|item| keep(item.request.page));
        self.queued_pages = self.tasks.iter().map(|item| item.request.page).collect();
        before - self.tasks.len()
    }

    pub fn contains(&self, page: PageNumber) -> bool {
        self.queued_pages.contains(&page)
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
        self.queued_pages.clear();
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
