mod registry;
mod viewport;

pub use registry::{PageRegistry, PageState, TextLayerStatus};
pub use viewport::{RetryPolicy, ScrollResolution, ScrollTarget, ViewportController};
