use std::num::NonZeroUsize;

use lru::LruCache;

use crate::backend::RgbaFrame;
use crate::page::PageNumber;
use crate::view::Rotation;

/// Identifies one page raster at one transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RasterKey {
    pub page: PageNumber,
    pub scale_milli: u32,
    pub rotation: Rotation,
}

impl RasterKey {
    pub fn new(page: PageNumber, scale: f32, rotation: Rotation) -> Self {
        let scale_milli = (scale.max(0.0) * 1000.0).round() as u32;
        Self {
            page,
            scale_milli,
            rotation,
        }
    }

    fn same_transform(&self, other: &RasterKey) -> bool {
        self.scale_milli == other.scale_milli && self.rotation == other.rotation
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheCounters {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// Page rasters bounded by entry count and by total pixel bytes.
///
/// A single raster larger than the whole budget is still accepted for the
/// current page so the page under the viewport can always be shown; it then
/// occupies the cache alone.
#[derive(Debug)]
pub struct RasterCache {
    max_entries: NonZeroUsize,
    memory_budget_bytes: usize,
    memory_bytes: usize,
    entries: LruCache<RasterKey, RgbaFrame>,
    counters: CacheCounters,
}

impl RasterCache {
    pub fn new(max_entries: usize, memory_budget_bytes: usize) -> Self {
        let max_entries = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            max_entries,
            memory_budget_bytes: memory_budget_bytes.max(1),
            memory_bytes: 0,
            entries: LruCache::new(max_entries),
            counters: CacheCounters::default(),
        }
    }

    pub fn get(&mut self, key: &RasterKey) -> Option<&RgbaFrame> {
        if self.entries.contains(key) {
            self.counters.hits += 1;
            return self.entries.get(key);
        }
        self.counters.misses += 1;
        None
    }

    pub fn peek(&self, key: &RasterKey) -> Option<&RgbaFrame> {
        self.entries.peek(key)
    }

    /// Inserts `frame`. Oversize frames are rejected unless `is_current`.
    pub fn insert(&mut self, key: RasterKey, frame: RgbaFrame, is_current: bool) -> bool {
        let frame_bytes = frame.byte_len();
        if frame_bytes > self.memory_budget_bytes {
            if !is_current {
                return false;
            }
            self.clear();
            self.memory_bytes = frame_bytes;
            self.entries.put(key, frame);
            return true;
        }

        if let Some(previous) = self.entries.pop(&key) {
            self.memory_bytes = self.memory_bytes.saturating_sub(previous.byte_len());
        }
        if self.entries.len() >= self.max_entries.get()
            && let Some((_, evicted)) = self.entries.pop_lru()
        {
            self.release(evicted.byte_len());
        }
        self.memory_bytes += frame_bytes;
        self.entries.put(key, frame);

        while self.memory_bytes > self.memory_budget_bytes && self.entries.len() > 1 {
            let Some((_, evicted)) = self.entries.pop_lru() else {
                break;
            };
            self.release(evicted.byte_len());
        }
        true
    }

    pub fn remove(&mut self, key: &RasterKey) -> bool {
        let Some(frame) = self.entries.pop(key) else {
            return false;
        };
        self.release(frame.byte_len());
        true
    }

    /// Drops every raster rendered at a different scale or rotation than
    /// `current`. Returns how many were dropped.
    pub fn retain_transform(&mut self, current: &RasterKey) -> usize {
        let stale: Vec<RasterKey> = self
            .entries
            .iter()
            .filter_map(|(key, _)| (!key.same_transform(current)).then_some(*key))
            .collect();
        for key in &stale {
            self.remove(key);
        }
        stale.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.memory_bytes = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn memory_bytes(&self) -> usize {
        self.memory_bytes
    }

    pub fn counters(&self) -> CacheCounters {
        self.counters
    }

    fn release(&mut self, bytes: usize) {
        self.memory_bytes = self.memory_bytes.saturating_sub(bytes);
        self.counters.evictions += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::{RasterCache, RasterKey};
    use crate::backend::RgbaFrame;
    use crate::test_support::page;
    use crate::view::Rotation;

    fn frame(width: u32, height: u32) -> RgbaFrame {
        RgbaFrame {
            width,
            height,
            pixels: vec![0xff; width as usize * height as usize * 4].into(),
        }
    }

    fn key(n: u32) -> RasterKey {
        RasterKey::new(page(n), 1.0, Rotation::Deg0)
    }

    #[test]
    fn get_counts_hits_and_misses() {
        let mut cache = RasterCache::new(4, 1024 * 1024);
        cache.insert(key(1), frame(10, 10), false);

        assert!(cache.get(&key(1)).is_some());
        assert!(cache.get(&key(2)).is_none());
        let counters = cache.counters();
        assert_eq!((counters.hits, counters.misses), (1, 1));
    }

    #[test]
    fn key_distinguishes_scale_and_rotation() {
        let base = RasterKey::new(page(1), 1.5, Rotation::Deg0);
        assert_ne!(base, RasterKey::new(page(1), 1.7, Rotation::Deg0));
        assert_ne!(base, RasterKey::new(page(1), 1.5, Rotation::Deg90));
        assert_eq!(base, RasterKey::new(page(1), 1.5, Rotation::Deg0));
    }

    #[test]
    fn entry_limit_evicts_least_recently_used() {
        let mut cache = RasterCache::new(2, 1024 * 1024);
        cache.insert(key(1), frame(4, 4), false);
        cache.insert(key(2), frame(5, 5), false);
        cache.get(&key(1));
        cache.insert(key(3), frame(6, 6), false);

        assert!(cache.peek(&key(1)).is_some());
        assert!(cache.peek(&key(2)).is_none());
        assert_eq!(
            cache.memory_bytes(),
            frame(4, 4).byte_len() + frame(6, 6).byte_len()
        );
    }

    #[test]
    fn byte_budget_evicts_until_under_budget() {
        let mut cache = RasterCache::new(8, 10_000);
        cache.insert(key(1), frame(40, 40), false);
        cache.insert(key(2), frame(40, 40), false);

        assert_eq!(cache.len(), 1);
        assert!(cache.memory_bytes() <= 10_000);
    }

    #[test]
    fn reinsert_replaces_without_double_counting() {
        let mut cache = RasterCache::new(4, 1024 * 1024);
        cache.insert(key(1), frame(8, 8), false);
        cache.insert(key(1), frame(10, 10), false);

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.memory_bytes(), frame(10, 10).byte_len());
    }

    #[test]
    fn oversize_raster_is_kept_only_for_current_page() {
        let mut cache = RasterCache::new(4, 100);
        cache.insert(key(1), frame(4, 4), false);

        assert!(!cache.insert(key(2), frame(8, 8), false));
        assert!(cache.peek(&key(1)).is_some());

        assert!(cache.insert(key(2), frame(8, 8), true));
        assert_eq!(cache.len(), 1);
        assert!(cache.peek(&key(2)).is_some());
    }

    #[test]
    fn retain_transform_drops_other_scales() {
        let mut cache = RasterCache::new(8, 1024 * 1024);
        cache.insert(key(1), frame(4, 4), false);
        cache.insert(RasterKey::new(page(2), 2.0, Rotation::Deg0), frame(4, 4), false);
        cache.insert(RasterKey::new(page(3), 1.0, Rotation::Deg180), frame(4, 4), false);

        assert_eq!(cache.retain_transform(&key(9)), 2);
        assert!(cache.peek(&key(1)).is_some());
        assert_eq!(cache.memory_bytes(), frame(4, 4).byte_len());
    }
}
