mod mapping;
mod transform;

pub use mapping::PageMapping;
pub use transform::{Rotation, SCALE_LADDER, ScrollMode, ViewTransform};
