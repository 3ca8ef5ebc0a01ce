pub mod annotate;
#[cfg(feature = "opencv")]
pub mod cascade;
pub mod oracle;
pub mod region;
#[cfg(feature = "rustface")]
pub mod seeta;

use std::fmt;
use std::str::FromStr;

use crate::error::DetectError;
use crate::models::{Color, DetectionParameters, Target};
use crate::pipeline::{DetectionStage, Pipeline};

const FACE_PARAMS: DetectionParameters = DetectionParameters::new(1.2, 10);
const EYES_PARAMS: DetectionParameters = DetectionParameters::new(1.02, 3);
const MOUTH_PARAMS: DetectionParameters = DetectionParameters::new(1.1, 15);
const BODY_PARAMS: DetectionParameters = DetectionParameters::new(1.1, 3);

/// Detection types accepted at the boundary. Closed set, fixed at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetectionType {
    Face,
    Eyes,
    Mouth,
    FullBody,
    UpperBody,
}

impl DetectionType {
    pub const ALL: [DetectionType; 5] = [
        DetectionType::Face,
        DetectionType::Eyes,
        DetectionType::Mouth,
        DetectionType::FullBody,
        DetectionType::UpperBody,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionType::Face => "face",
            DetectionType::Eyes => "eyes",
            DetectionType::Mouth => "mouth",
            DetectionType::FullBody => "fullbody",
            DetectionType::UpperBody => "upperbody",
        }
    }

    /// Stages making up this detection type's pipeline
    pub fn stages(&self) -> (DetectionStage, Option<DetectionStage>) {
        match self {
            DetectionType::Face => (
                DetectionStage::root(Target::Face, FACE_PARAMS).drawn(Color::GREEN),
                None,
            ),
            // Face box only scopes the search and is not drawn
            DetectionType::Eyes => (
                DetectionStage::root(Target::Face, FACE_PARAMS),
                Some(DetectionStage::scoped(Target::Eyes, EYES_PARAMS).drawn(Color::WHITE)),
            ),
            DetectionType::Mouth => (
                DetectionStage::root(Target::Face, FACE_PARAMS),
                Some(DetectionStage::scoped(Target::Mouth, MOUTH_PARAMS).drawn(Color::RED)),
            ),
            DetectionType::FullBody => (
                DetectionStage::root(Target::FullBody, BODY_PARAMS).drawn(Color::BLUE),
                None,
            ),
            DetectionType::UpperBody => (
                DetectionStage::root(Target::UpperBody, BODY_PARAMS).drawn(Color::ORANGE),
                None,
            ),
        }
    }

    /// Build the pipeline for this detection type
    pub fn pipeline(&self) -> Pipeline {
        let (root, scoped) = self.stages();
        let pipeline = Pipeline::new(self.as_str(), root);
        match scoped {
            Some(stage) => pipeline.add_stage(stage),
            None => pipeline,
        }
    }

    /// Cascade targets this type needs loaded
    pub fn targets(&self) -> Vec<Target> {
        let (root, scoped) = self.stages();
        std::iter::once(root.target)
            .chain(scoped.map(|s| s.target))
            .collect()
    }
}

impl FromStr for DetectionType {
    type Err = DetectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DetectionType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| DetectError::UnknownDetectionType(s.to_string()))
    }
}

impl fmt::Display for DetectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Look up the pipeline registered for a detection type identifier
pub fn resolve(detection_type: &str) -> Result<Pipeline, DetectError> {
    Ok(detection_type.parse::<DetectionType>()?.pipeline())
}
