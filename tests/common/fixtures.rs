use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use facescope::{BoundingBox, Color, DetectError, DetectionParameters, Detector, DetectorSet, RegionView, Target};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

/// Detector returning the same local boxes for every region it is shown,
/// keeping only those that fit, and recording each region's bounds.
pub struct ScriptedDetector {
    boxes: Vec<BoundingBox>,
    calls: Mutex<Vec<(BoundingBox, DetectionParameters)>>,
}

impl ScriptedDetector {
    pub fn new(boxes: Vec<BoundingBox>) -> Arc<Self> {
        Arc::new(Self {
            boxes,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn none() -> Arc<Self> {
        Self::new(Vec::new())
    }

    /// Regions this detector was invoked on, in call order
    pub fn regions(&self) -> Vec<BoundingBox> {
        self.calls.lock().unwrap().iter().map(|(r, _)| *r).collect()
    }

    pub fn params(&self) -> Vec<DetectionParameters> {
        self.calls.lock().unwrap().iter().map(|(_, p)| *p).collect()
    }
}

impl Detector for ScriptedDetector {
    fn detect(&self, region: &RegionView<'_>, params: &DetectionParameters) -> Result<Vec<BoundingBox>, DetectError> {
        self.calls.lock().unwrap().push((region.bounds(), *params));
        let (w, h) = region.dimensions();
        Ok(self
            .boxes
            .iter()
            .copied()
            .filter(|b| b.right() <= w && b.bottom() <= h)
            .collect())
    }
}

/// Detector set with the given scripted detectors registered
pub fn detectors(entries: &[(Target, Arc<ScriptedDetector>)]) -> DetectorSet {
    entries.iter().fold(DetectorSet::new(), |set, (target, det)| {
        set.with(*target, det.clone() as Arc<dyn Detector>)
    })
}

pub const BACKGROUND: Rgb<u8> = Rgb([90, 60, 40]);

/// 200x160 image with a lighter "face-like" square at (60, 40) sized 80x80
pub fn face_image() -> RgbImage {
    RgbImage::from_fn(200, 160, |x, y| {
        if (60..140).contains(&x) && (40..120).contains(&y) {
            Rgb([200, 170, 150])
        } else {
            BACKGROUND
        }
    })
}

pub fn plain_image(width: u32, height: u32) -> RgbImage {
    RgbImage::from_pixel(width, height, BACKGROUND)
}

pub fn dynamic(img: &RgbImage) -> DynamicImage {
    DynamicImage::ImageRgb8(img.clone())
}

pub fn png_bytes(img: &RgbImage) -> Vec<u8> {
    let mut buf = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)
        .expect("Failed to encode test image");
    buf.into_inner()
}

/// Pixels covered by an annotation outline of the given stroke width
pub fn outline(bbox: BoundingBox, thickness: u32) -> HashSet<(u32, u32)> {
    let mut pixels = HashSet::new();
    for y in bbox.y..bbox.bottom() {
        for x in bbox.x..bbox.right() {
            let inset = (x - bbox.x)
                .min(bbox.right() - 1 - x)
                .min(y - bbox.y)
                .min(bbox.bottom() - 1 - y);
            if inset < thickness {
                pixels.insert((x, y));
            }
        }
    }
    pixels
}

/// Coordinates whose pixel differs between the two images
pub fn changed_pixels(before: &RgbImage, after: &RgbImage) -> HashSet<(u32, u32)> {
    assert_eq!(before.dimensions(), after.dimensions());
    before
        .enumerate_pixels()
        .filter(|&(x, y, p)| after.get_pixel(x, y) != p)
        .map(|(x, y, _)| (x, y))
        .collect()
}

/// Assert `after` is `before` plus exactly these outlines, each in `color`
pub fn assert_exact_rectangles(before: &RgbImage, after: &RgbImage, boxes: &[BoundingBox], color: Color) {
    let expected: HashSet<(u32, u32)> = boxes.iter().flat_map(|b| outline(*b, 2)).collect();
    let changed = changed_pixels(before, after);
    assert_eq!(changed, expected, "annotated pixels differ from expected outlines");
    for (x, y) in &changed {
        assert_eq!(*after.get_pixel(*x, *y), color.to_rgb(), "pixel ({x}, {y}) has wrong colour");
    }
}
