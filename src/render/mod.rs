mod cache;
mod queue;

pub use cache::{CacheCounters, RasterCache, RasterKey};
pub use queue::{RenderClass, RenderQueue, RenderRequest};
