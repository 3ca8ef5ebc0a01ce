use image::Rgb;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Axis-aligned box in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Exclusive right edge, saturating at `u32::MAX`
    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    /// Exclusive bottom edge, saturating at `u32::MAX`
    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// True when `other` lies entirely inside this box
    pub fn contains(&self, other: &BoundingBox) -> bool {
        let edge = |start: u32, len: u32| u64::from(start) + u64::from(len);
        other.x >= self.x
            && other.y >= self.y
            && edge(other.x, other.width) <= edge(self.x, self.width)
            && edge(other.y, other.height) <= edge(self.y, self.height)
    }

    /// Shift by an origin, e.g. when mapping a sub-region hit back to the parent image.
    /// None when the shifted box would not fit in `u32` coordinates.
    pub fn offset(&self, dx: u32, dy: u32) -> Option<Self> {
        let x = self.x.checked_add(dx)?;
        let y = self.y.checked_add(dy)?;
        x.checked_add(self.width)?;
        y.checked_add(self.height)?;
        Some(Self {
            x,
            y,
            width: self.width,
            height: self.height,
        })
    }

    /// Intersection with a `width` x `height` canvas anchored at the origin.
    /// Returns None when nothing of the box is visible.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<Self> {
        if self.x >= width || self.y >= height || self.is_empty() {
            return None;
        }
        Some(Self {
            x: self.x,
            y: self.y,
            width: self.right().min(width) - self.x,
            height: self.bottom().min(height) - self.y,
        })
    }
}

/// Annotation colour (RGB)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const GREEN: Color = Color { r: 0, g: 255, b: 0 };
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255 };
    pub const RED: Color = Color { r: 255, g: 0, b: 0 };
    pub const BLUE: Color = Color { r: 0, g: 0, b: 255 };
    pub const ORANGE: Color = Color { r: 255, g: 165, b: 0 };

    pub fn to_rgb(self) -> Rgb<u8> {
        Rgb([self.r, self.g, self.b])
    }
}

impl From<Color> for Rgb<u8> {
    fn from(color: Color) -> Self {
        color.to_rgb()
    }
}

/// Minimum window dimensions accepted by a detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinSize {
    pub width: u32,
    pub height: u32,
}

/// Sensitivity settings handed to the detector for one stage.
///
/// `scale_factor` must exceed 1.0 (search-window growth per pass) and
/// `min_neighbors` must be at least 1 (how many overlapping raw hits a
/// region needs before it is reported).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionParameters {
    pub scale_factor: f32,
    pub min_neighbors: u32,
    pub min_size: Option<MinSize>,
}

impl DetectionParameters {
    pub const fn new(scale_factor: f32, min_neighbors: u32) -> Self {
        Self {
            scale_factor,
            min_neighbors,
            min_size: None,
        }
    }

    pub const fn with_min_size(mut self, width: u32, height: u32) -> Self {
        self.min_size = Some(MinSize { width, height });
        self
    }

    pub fn is_valid(&self) -> bool {
        self.scale_factor > 1.0 && self.min_neighbors >= 1
    }
}

/// Object class a cascade is trained for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    Face,
    Eyes,
    Mouth,
    FullBody,
    UpperBody,
}

impl Target {
    pub const ALL: [Target; 5] = [
        Target::Face,
        Target::Eyes,
        Target::Mouth,
        Target::FullBody,
        Target::UpperBody,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Target::Face => "face",
            Target::Eyes => "eyes",
            Target::Mouth => "mouth",
            Target::FullBody => "fullbody",
            Target::UpperBody => "upperbody",
        }
    }

    /// Stock OpenCV Haar cascade file for this target
    pub fn cascade_file(&self) -> &'static str {
        match self {
            Target::Face => "haarcascade_frontalface_default.xml",
            Target::Eyes => "haarcascade_eye.xml",
            Target::Mouth => "haarcascade_smile.xml",
            Target::FullBody => "haarcascade_fullbody.xml",
            Target::UpperBody => "haarcascade_upperbody.xml",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One annotated hit, always in full-image coordinates
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    pub target: Target,
    pub bbox: BoundingBox,
    /// Root-stage box this hit was searched within, if any
    pub parent: Option<BoundingBox>,
}
