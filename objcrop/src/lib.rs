pub mod crop_pipeline;
pub mod patch_io;
pub mod summary;

pub use crop_pipeline::{CropPipeline, CropPipelineCfg, DepthPolicy};
pub use summary::{CropSummary, FrameSkip};
