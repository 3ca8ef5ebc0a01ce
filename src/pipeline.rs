use image::{DynamicImage, GrayImage, RgbImage};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::detection::annotate::{DEFAULT_THICKNESS, annotate};
use crate::detection::oracle::DetectorSet;
use crate::detection::region::RegionView;
use crate::error::{DetectError, StorageError};
use crate::models::{BoundingBox, Color, Detection, DetectionParameters, Target};

/// Where a stage searches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageScope {
    /// The whole image (root stage)
    WholeImage,
    /// Independently inside every box the root stage produced
    WithinRoot,
}

/// One detection step: which cascade, with which sensitivity, where, and how
/// (or whether) to draw its hits
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionStage {
    pub target: Target,
    pub params: DetectionParameters,
    /// None means the stage only scopes later stages and is never drawn
    pub color: Option<Color>,
    pub scope: StageScope,
}

impl DetectionStage {
    pub const fn root(target: Target, params: DetectionParameters) -> Self {
        Self {
            target,
            params,
            color: None,
            scope: StageScope::WholeImage,
        }
    }

    pub const fn scoped(target: Target, params: DetectionParameters) -> Self {
        Self {
            target,
            params,
            color: None,
            scope: StageScope::WithinRoot,
        }
    }

    pub const fn drawn(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    pub fn name(&self) -> &'static str {
        self.target.as_str()
    }

    /// Run the detector over `view`, returning hits in full-image coordinates
    fn detect(&self, detectors: &DetectorSet, view: &RegionView<'_>) -> Result<Vec<BoundingBox>, DetectError> {
        let detector = detectors.get(self.target)?;
        let bounds = view.bounds();

        let hits: Vec<BoundingBox> = detector
            .detect(view, &self.params)?
            .into_iter()
            .filter_map(|local| match view.to_global(local) {
                Some(global) if bounds.contains(&global) => Some(global),
                _ => {
                    warn!(stage = self.name(), ?local, ?bounds, "detector returned box outside its region, dropped");
                    None
                }
            })
            .collect();

        debug!(stage = self.name(), region = ?bounds, hits = hits.len(), "stage detection");
        Ok(hits)
    }
}

/// Progress of one pipeline invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    NotStarted,
    RootStageComplete,
    ScopedStagesComplete,
    /// Root stage found nothing, so no scoped stage ran
    ScopedStagesSkipped,
    Done,
}

impl PipelineState {
    /// Next state given how many boxes the root stage produced
    pub fn next(self, root_hits: usize) -> Self {
        match self {
            PipelineState::NotStarted => PipelineState::RootStageComplete,
            PipelineState::RootStageComplete if root_hits == 0 => PipelineState::ScopedStagesSkipped,
            PipelineState::RootStageComplete => PipelineState::ScopedStagesComplete,
            PipelineState::ScopedStagesComplete | PipelineState::ScopedStagesSkipped | PipelineState::Done => {
                PipelineState::Done
            }
        }
    }
}

/// Result of running a pipeline over one image
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// Input image with every drawn detection
    pub image: RgbImage,
    /// Boxes produced by the root stage, drawn or not
    pub regions: Vec<BoundingBox>,
    /// Every box that was drawn, in full-image coordinates
    pub detections: Vec<Detection>,
    /// States visited, in order
    pub states: Vec<PipelineState>,
}

impl PipelineOutcome {
    pub fn count(&self, target: Target) -> usize {
        self.detections.iter().filter(|d| d.target == target).count()
    }

    pub fn scoped_skipped(&self) -> bool {
        self.states.contains(&PipelineState::ScopedStagesSkipped)
    }
}

/// Context available to every stage
#[derive(Clone, Debug, Default)]
pub struct PipelineContext {
    /// Root directory for debug outputs; debug mode is on when set
    pub debug_dir: Option<PathBuf>,
}

impl PipelineContext {
    fn debug_dir(&self) -> Option<&Path> {
        self.debug_dir.as_deref()
    }
}

/// Coarse-to-fine detection pipeline.
///
/// One root stage searches the whole image; every further stage searches
/// inside each root box on its own and never sees the other stages' hits.
#[derive(Debug, Clone)]
pub struct Pipeline {
    name: String,
    root: DetectionStage,
    scoped: Vec<DetectionStage>,
    thickness: u32,
    context: PipelineContext,
}

impl Pipeline {
    /// Create a pipeline from its root stage
    pub fn new(name: impl Into<String>, root: DetectionStage) -> Self {
        debug_assert_eq!(root.scope, StageScope::WholeImage);
        debug_assert!(root.params.is_valid(), "invalid parameters for {}", root.name());
        Self {
            name: name.into(),
            root,
            scoped: Vec::new(),
            thickness: DEFAULT_THICKNESS,
            context: PipelineContext::default(),
        }
    }

    /// Add a stage that runs inside every root box
    pub fn add_stage(mut self, stage: DetectionStage) -> Self {
        debug_assert_eq!(stage.scope, StageScope::WithinRoot);
        debug_assert!(stage.params.is_valid(), "invalid parameters for {}", stage.name());
        self.scoped.push(stage);
        self
    }

    pub fn with_thickness(mut self, thickness: u32) -> Self {
        self.thickness = thickness;
        self
    }

    /// Enable debug mode with output directory
    /// The directory must be empty or non-existent
    pub fn with_debug(mut self, output_dir: PathBuf) -> anyhow::Result<Self> {
        if output_dir.exists() {
            let entries = std::fs::read_dir(&output_dir)?;
            if entries.count() > 0 {
                return Err(anyhow::anyhow!(
                    "Debug directory is not empty: {}",
                    output_dir.display()
                ));
            }
        } else {
            std::fs::create_dir_all(&output_dir)?;
        }

        self.context.debug_dir = Some(output_dir);

        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &DetectionStage {
        &self.root
    }

    pub fn scoped_stages(&self) -> &[DetectionStage] {
        &self.scoped
    }

    /// Detect, annotate and return the image.
    ///
    /// Zero root hits is a successful run: scoped stages are skipped and the
    /// image comes back as it went in.
    pub fn run(&self, detectors: &DetectorSet, input: &DynamicImage) -> Result<PipelineOutcome, DetectError> {
        let gray = input.to_luma8();
        let mut image = input.to_rgb8();
        let mut detections = Vec::new();
        let mut state = PipelineState::NotStarted;
        let mut states = vec![state];

        debug!(pipeline = %self.name, width = image.width(), height = image.height(), "pipeline started");
        self.save_debug(0, "input", &[DynamicImage::ImageRgb8(image.clone())])?;

        let regions = self.root.detect(detectors, &RegionView::full(&gray))?;
        self.draw_all(&mut image, &self.root, &regions, None, &mut detections)?;
        self.save_debug_regions(&gray, &regions)?;

        state = state.next(regions.len());
        states.push(state);

        state = state.next(regions.len());
        states.push(state);

        if state == PipelineState::ScopedStagesComplete {
            for stage in &self.scoped {
                for parent in &regions {
                    let Some(view) = RegionView::within(&gray, *parent) else {
                        continue;
                    };
                    let hits = stage.detect(detectors, &view)?;
                    self.draw_all(&mut image, stage, &hits, Some(*parent), &mut detections)?;
                }
            }
        } else {
            debug!(pipeline = %self.name, "root stage found nothing, scoped stages skipped");
        }

        state = state.next(regions.len());
        states.push(state);

        self.save_debug(
            2 + self.scoped.len(),
            "annotated",
            &[DynamicImage::ImageRgb8(image.clone())],
        )?;

        debug!(
            pipeline = %self.name,
            regions = regions.len(),
            drawn = detections.len(),
            "pipeline done"
        );

        Ok(PipelineOutcome {
            image,
            regions,
            detections,
            states,
        })
    }

    fn draw_all(
        &self,
        image: &mut RgbImage,
        stage: &DetectionStage,
        boxes: &[BoundingBox],
        parent: Option<BoundingBox>,
        detections: &mut Vec<Detection>,
    ) -> Result<(), DetectError> {
        let Some(color) = stage.color else {
            return Ok(());
        };
        for bbox in boxes {
            let drawn = annotate(image, *bbox, color, self.thickness)?;
            detections.push(Detection {
                target: stage.target,
                bbox: drawn,
                parent,
            });
        }
        Ok(())
    }

    fn save_debug_regions(&self, gray: &GrayImage, regions: &[BoundingBox]) -> Result<(), DetectError> {
        if self.context.debug_dir().is_none() {
            return Ok(());
        }
        let crops: Vec<DynamicImage> = regions
            .iter()
            .filter_map(|b| RegionView::within(gray, *b))
            .map(|view| DynamicImage::ImageLuma8(view.to_image()))
            .collect();
        self.save_debug(1, self.root.name(), &crops)
    }

    /// Write images to `<debug>/<NN>_<step>/<MM>.png` when debug mode is on
    fn save_debug(&self, step_idx: usize, step_name: &str, images: &[DynamicImage]) -> Result<(), DetectError> {
        let Some(dir) = self.context.debug_dir() else {
            return Ok(());
        };

        let step_dir_name = format!("{:02}_{}", step_idx, step_name.to_lowercase().replace(' ', "_"));
        let step_dir = dir.join(&step_dir_name);
        std::fs::create_dir_all(&step_dir).map_err(StorageError::from)?;

        for (idx, img) in images.iter().enumerate() {
            let output_path = step_dir.join(format!("{:02}.png", idx + 1));
            img.save(&output_path)
                .map_err(|e| StorageError::Encode(e.to_string()))?;
        }

        debug!("saved {} debug images to {}/", images.len(), step_dir_name);
        Ok(())
    }
}
