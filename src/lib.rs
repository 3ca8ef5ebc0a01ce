pub mod detection;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod server;
pub mod storage;

pub use detection::{DetectionType, resolve};
pub use detection::oracle::{Detector, DetectorSet};
pub use detection::region::RegionView;
pub use error::{DetectError, StorageError};
pub use models::{BoundingBox, Color, Detection, DetectionParameters, MinSize, Target};
pub use pipeline::{DetectionStage, Pipeline, PipelineOutcome, PipelineState, StageScope};
pub use storage::ImageStore;
