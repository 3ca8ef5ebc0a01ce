use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::detection::region::RegionView;
use crate::error::DetectError;
use crate::models::{BoundingBox, DetectionParameters, Target};

/// Where OpenCV installs its stock Haar cascades, checked after `./cascades`
const CASCADE_DIRS: &[&str] = &[
    "cascades",
    "/usr/share/opencv4/haarcascades",
    "/usr/local/share/opencv4/haarcascades",
    "/usr/share/opencv/haarcascades",
    "/usr/local/share/opencv/haarcascades",
];

/// First directory holding a stock face cascade, else `cascades`
pub fn default_cascade_dir() -> PathBuf {
    for dir in CASCADE_DIRS {
        let path = Path::new(dir);
        if path.join(Target::Face.cascade_file()).exists() {
            debug!(dir = %path.display(), "found cascade directory");
            return path.to_path_buf();
        }
    }
    PathBuf::from(CASCADE_DIRS[0])
}

/// Black-box object detector.
///
/// Implementations must not retain or mutate the region, and report boxes in
/// the region's local coordinates, each lying inside the region. An empty
/// result means nothing matched and is not an error.
pub trait Detector: Send + Sync {
    fn detect(&self, region: &RegionView<'_>, params: &DetectionParameters) -> Result<Vec<BoundingBox>, DetectError>;
}

/// Detectors keyed by target. Built once at startup and shared read-only.
#[derive(Clone, Default)]
pub struct DetectorSet {
    detectors: BTreeMap<Target, Arc<dyn Detector>>,
}

impl DetectorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a detector for a target, replacing any previous one
    pub fn with(mut self, target: Target, detector: Arc<dyn Detector>) -> Self {
        self.detectors.insert(target, detector);
        self
    }

    /// Load every model found in `dir`.
    ///
    /// Each target uses its stock OpenCV cascade (`opencv` feature). Faces
    /// fall back to the SeetaFace model (`rustface` feature) when no face
    /// cascade is present. Missing files leave the target unavailable;
    /// unreadable ones are errors.
    pub fn load_dir(dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let dir = dir.as_ref();
        let mut set = Self::new();

        for target in Target::ALL {
            match load_target(dir, target)? {
                Some(detector) => set = set.with(target, detector),
                None => warn!(%target, dir = %dir.display(), "no model found, target disabled"),
            }
        }

        if set.is_empty() {
            warn!(dir = %dir.display(), "no detectors loaded, every detection request will fail");
        } else {
            info!(targets = ?set.targets().collect::<Vec<_>>(), "detectors ready");
        }
        Ok(set)
    }

    pub fn get(&self, target: Target) -> Result<&Arc<dyn Detector>, DetectError> {
        self.detectors
            .get(&target)
            .ok_or(DetectError::DetectorUnavailable(target))
    }

    pub fn targets(&self) -> impl Iterator<Item = Target> + '_ {
        self.detectors.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }
}

#[allow(unused_variables)]
fn load_target(dir: &Path, target: Target) -> anyhow::Result<Option<Arc<dyn Detector>>> {
    #[cfg(feature = "opencv")]
    {
        let path = dir.join(target.cascade_file());
        if path.exists() {
            let cascade = crate::detection::cascade::CascadeDetector::load(&path)?;
            info!(%target, path = %path.display(), "loaded Haar cascade");
            return Ok(Some(Arc::new(cascade)));
        }
    }

    #[cfg(feature = "rustface")]
    {
        let path = dir.join(crate::detection::seeta::MODEL_FILE);
        if target == Target::Face && path.exists() {
            let model = crate::detection::seeta::SeetaFaceDetector::load(&path)?;
            info!(%target, path = %path.display(), "loaded SeetaFace model");
            return Ok(Some(Arc::new(model)));
        }
    }

    Ok(None)
}

impl std::fmt::Debug for DetectorSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectorSet")
            .field("targets", &self.detectors.keys().collect::<Vec<_>>())
            .finish()
    }
}
