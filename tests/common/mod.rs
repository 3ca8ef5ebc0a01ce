#![allow(dead_code)]

mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from facescope for tests
pub use facescope::{
    BoundingBox, Color, DetectError, Detection, DetectionParameters, Detector, DetectorSet,
    PipelineState, RegionView, Target,
};
