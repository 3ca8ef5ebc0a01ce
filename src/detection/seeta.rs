//! Pure-Rust face backend on the SeetaFace engine (`rustface`).

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::Context;

use crate::detection::oracle::Detector;
use crate::detection::region::RegionView;
use crate::error::DetectError;
use crate::models::{BoundingBox, DetectionParameters};

/// SeetaFace frontal model looked up inside the cascade directory
pub const MODEL_FILE: &str = "seeta_fd_frontal_v1.0.bin";

/// Smallest face the engine accepts
const MIN_FACE_SIZE: u32 = 20;
const SCORE_THRESHOLD: f64 = 2.0;
const WINDOW_STEP: u32 = 4;

/// Face detector backed by a SeetaFace model.
///
/// The engine keeps per-run state, so each call works on its own detector
/// built from a clone of the shared model.
pub struct SeetaFaceDetector {
    model: rustface::Model,
}

impl SeetaFaceDetector {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        let model = rustface::read_model(BufReader::new(file))
            .map_err(|e| anyhow::anyhow!("invalid SeetaFace model {}: {}", path.display(), e))?;
        Ok(Self { model })
    }
}

impl Detector for SeetaFaceDetector {
    /// `scale_factor` becomes the pyramid step. `min_neighbors` has no
    /// counterpart here; the engine merges overlapping windows itself.
    fn detect(&self, region: &RegionView<'_>, params: &DetectionParameters) -> Result<Vec<BoundingBox>, DetectError> {
        let (width, height) = region.dimensions();
        if width < MIN_FACE_SIZE || height < MIN_FACE_SIZE {
            return Ok(Vec::new());
        }

        let mut detector = rustface::create_detector_with_model(self.model.clone());
        detector.set_min_face_size(min_face_size(params));
        detector.set_score_thresh(SCORE_THRESHOLD);
        detector.set_pyramid_scale_factor(pyramid_step(params.scale_factor));
        detector.set_slide_window_step(WINDOW_STEP, WINDOW_STEP);

        let pixels = region.to_image();
        let faces = detector.detect(&rustface::ImageData::new(pixels.as_raw(), width, height));

        Ok(faces
            .iter()
            .filter_map(|face| {
                let b = face.bbox();
                clip(b.x(), b.y(), b.width(), b.height(), width, height)
            })
            .collect())
    }
}

fn min_face_size(params: &DetectionParameters) -> u32 {
    params
        .min_size
        .map(|m| m.width.min(m.height))
        .unwrap_or(MIN_FACE_SIZE)
        .max(MIN_FACE_SIZE)
}

/// Pyramid shrink factor in (0, 1) for a window growth factor above 1
fn pyramid_step(scale_factor: f32) -> f32 {
    if scale_factor > 1.0 {
        (1.0 / scale_factor).clamp(0.01, 0.99)
    } else {
        0.8
    }
}

/// Face box clipped to the region; None if nothing remains
fn clip(x: i32, y: i32, w: u32, h: u32, width: u32, height: u32) -> Option<BoundingBox> {
    let left = i64::from(x).max(0);
    let top = i64::from(y).max(0);
    let right = (i64::from(x) + i64::from(w)).min(i64::from(width));
    let bottom = (i64::from(y) + i64::from(h)).min(i64::from(height));
    if right <= left || bottom <= top {
        return None;
    }
    Some(BoundingBox::new(
        u32::try_from(left).ok()?,
        u32::try_from(top).ok()?,
        u32::try_from(right - left).ok()?,
        u32::try_from(bottom - top).ok()?,
    ))
}
