//! OpenCV Haar cascade backend.
//!
//! Wraps `cv::CascadeClassifier` loaded from the stock `haarcascade_*.xml`
//! files OpenCV ships. `detectMultiScale` needs exclusive access to the
//! classifier, so each one sits behind a mutex; requests for different
//! targets never contend.

use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, bail};
use opencv::core::{CV_8UC1, Mat, Rect, Scalar, Size, Vector};
use opencv::objdetect::CascadeClassifier;
use opencv::prelude::*;
use tracing::trace;

use crate::detection::oracle::Detector;
use crate::detection::region::RegionView;
use crate::error::DetectError;
use crate::models::{BoundingBox, DetectionParameters};

pub struct CascadeDetector {
    classifier: Mutex<CascadeClassifier>,
}

impl CascadeDetector {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let name = path
            .to_str()
            .with_context(|| format!("cascade path is not UTF-8: {}", path.display()))?;
        let classifier = CascadeClassifier::new(name)
            .with_context(|| format!("failed to read cascade {}", path.display()))?;
        if classifier.empty()? {
            bail!("cascade {} is empty or not a cascade file", path.display());
        }
        Ok(Self {
            classifier: Mutex::new(classifier),
        })
    }
}

impl Detector for CascadeDetector {
    fn detect(&self, region: &RegionView<'_>, params: &DetectionParameters) -> Result<Vec<BoundingBox>, DetectError> {
        let (width, height) = region.dimensions();
        let mat = to_mat(region).map_err(backend)?;

        let min_size = params
            .min_size
            .map(|m| Size::new(clamp_i32(m.width), clamp_i32(m.height)))
            .unwrap_or_default();

        let mut objects = Vector::<Rect>::new();
        {
            let mut classifier = self
                .classifier
                .lock()
                .map_err(|_| DetectError::Backend("cascade lock poisoned".into()))?;
            classifier
                .detect_multi_scale(
                    &mat,
                    &mut objects,
                    f64::from(params.scale_factor),
                    clamp_i32(params.min_neighbors),
                    0,
                    min_size,
                    Size::default(),
                )
                .map_err(backend)?;
        }

        let boxes: Vec<BoundingBox> = objects
            .iter()
            .filter_map(|r| to_local_box(r, width, height))
            .collect();
        trace!(raw = objects.len(), kept = boxes.len(), "detectMultiScale");
        Ok(boxes)
    }
}

/// Single-channel copy of the viewed pixels
fn to_mat(region: &RegionView<'_>) -> opencv::Result<Mat> {
    let pixels = region.to_image();
    let mut mat = Mat::new_rows_cols_with_default(
        clamp_i32(pixels.height()),
        clamp_i32(pixels.width()),
        CV_8UC1,
        Scalar::all(0.0),
    )?;
    mat.data_bytes_mut()?.copy_from_slice(pixels.as_raw());
    Ok(mat)
}

/// Rect in region coordinates, clipped to the region; None if nothing remains
fn to_local_box(rect: Rect, width: u32, height: u32) -> Option<BoundingBox> {
    let x = u32::try_from(rect.x.max(0)).ok()?;
    let y = u32::try_from(rect.y.max(0)).ok()?;
    let right = u32::try_from(rect.x.saturating_add(rect.width).max(0)).ok()?.min(width);
    let bottom = u32::try_from(rect.y.saturating_add(rect.height).max(0)).ok()?.min(height);
    (right > x && bottom > y).then(|| BoundingBox::new(x, y, right - x, bottom - y))
}

fn clamp_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn backend(err: opencv::Error) -> DetectError {
    DetectError::Backend(err.to_string())
}
