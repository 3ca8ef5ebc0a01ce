mod common;

use common::*;
use facescope::{DetectionStage, DetectionType, Pipeline, StageScope, resolve};

#[test]
fn zero_roots_leave_every_pipeline_unchanged() {
    let img = face_image();
    let set = detectors(&[
        (Target::Face, ScriptedDetector::none()),
        (Target::Eyes, ScriptedDetector::new(vec![BoundingBox::new(1, 1, 5, 5)])),
        (Target::Mouth, ScriptedDetector::new(vec![BoundingBox::new(1, 1, 5, 5)])),
        (Target::FullBody, ScriptedDetector::none()),
        (Target::UpperBody, ScriptedDetector::none()),
    ]);

    for kind in DetectionType::ALL {
        let outcome = kind.pipeline().run(&set, &dynamic(&img)).unwrap();
        assert_eq!(outcome.image, img, "{kind} pipeline modified the image");
        assert!(outcome.detections.is_empty());
        assert_eq!(
            outcome.states,
            vec![
                PipelineState::NotStarted,
                PipelineState::RootStageComplete,
                PipelineState::ScopedStagesSkipped,
                PipelineState::Done,
            ]
        );
    }
}

#[test]
fn scoped_stage_never_runs_without_roots() {
    let eyes = ScriptedDetector::new(vec![BoundingBox::new(0, 0, 4, 4)]);
    let set = detectors(&[(Target::Face, ScriptedDetector::none()), (Target::Eyes, eyes.clone())]);

    resolve("eyes").unwrap().run(&set, &dynamic(&face_image())).unwrap();
    assert!(eyes.regions().is_empty());
}

#[test]
fn missing_scoped_detector_is_harmless_when_no_roots() {
    let set = detectors(&[(Target::Face, ScriptedDetector::none())]);
    let outcome = resolve("mouth").unwrap().run(&set, &dynamic(&face_image())).unwrap();
    assert!(outcome.scoped_skipped());
}

#[test]
fn missing_root_detector_is_an_error() {
    let set = detectors(&[]);
    let err = resolve("fullbody").unwrap().run(&set, &dynamic(&face_image())).unwrap_err();
    assert!(matches!(err, DetectError::DetectorUnavailable(Target::FullBody)));
}

#[test]
fn face_pipeline_draws_one_green_rectangle() {
    let img = face_image();
    let face = BoundingBox::new(60, 40, 80, 80);
    let set = detectors(&[(Target::Face, ScriptedDetector::new(vec![face]))]);

    let outcome = resolve("face").unwrap().run(&set, &dynamic(&img)).unwrap();

    assert_exact_rectangles(&img, &outcome.image, &[face], Color::GREEN);
    assert_eq!(outcome.count(Target::Face), 1);
    assert_eq!(outcome.detections[0].bbox, face);
    assert_eq!(outcome.detections[0].parent, None);
}

#[test]
fn face_parameters_reach_the_detector() {
    let face = ScriptedDetector::none();
    let set = detectors(&[(Target::Face, face.clone())]);
    resolve("face").unwrap().run(&set, &dynamic(&face_image())).unwrap();
    assert_eq!(face.params(), vec![DetectionParameters::new(1.2, 10)]);
    assert_eq!(face.regions(), vec![BoundingBox::new(0, 0, 200, 160)]);
}

#[test]
fn eyes_pipeline_without_eyes_leaves_image_unchanged() {
    let img = face_image();
    let set = detectors(&[
        (Target::Face, ScriptedDetector::new(vec![BoundingBox::new(60, 40, 80, 80)])),
        (Target::Eyes, ScriptedDetector::none()),
    ]);

    let outcome = resolve("eyes").unwrap().run(&set, &dynamic(&img)).unwrap();

    // The face box scopes the search but is never drawn
    assert_eq!(outcome.image, img);
    assert_eq!(outcome.regions, vec![BoundingBox::new(60, 40, 80, 80)]);
    assert!(outcome.detections.is_empty());
    assert!(outcome.states.contains(&PipelineState::ScopedStagesComplete));
}

#[test]
fn eyes_are_searched_inside_each_face_and_reported_globally() {
    let img = plain_image(300, 200);
    let faces = vec![BoundingBox::new(10, 20, 100, 90), BoundingBox::new(150, 50, 120, 120)];
    let local_eye = BoundingBox::new(20, 25, 18, 10);
    let eyes = ScriptedDetector::new(vec![local_eye]);
    let set = detectors(&[
        (Target::Face, ScriptedDetector::new(faces.clone())),
        (Target::Eyes, eyes.clone()),
    ]);

    let outcome = resolve("eyes").unwrap().run(&set, &dynamic(&img)).unwrap();

    assert_eq!(eyes.regions(), faces);
    assert_eq!(eyes.params(), vec![DetectionParameters::new(1.02, 3); 2]);
    assert_eq!(outcome.count(Target::Eyes), 2);
    for (det, face) in outcome.detections.iter().zip(&faces) {
        assert_eq!(det.parent, Some(*face));
        assert_eq!(Some(det.bbox), local_eye.offset(face.x, face.y));
        assert!(face.contains(&det.bbox));
    }

    let expected: Vec<BoundingBox> = outcome.detections.iter().map(|d| d.bbox).collect();
    assert_exact_rectangles(&img, &outcome.image, &expected, Color::WHITE);
}

#[test]
fn mouth_pipeline_draws_red_inside_face() {
    let img = face_image();
    let face = BoundingBox::new(60, 40, 80, 80);
    let set = detectors(&[
        (Target::Face, ScriptedDetector::new(vec![face])),
        (Target::Mouth, ScriptedDetector::new(vec![BoundingBox::new(25, 55, 30, 15)])),
    ]);

    let outcome = resolve("mouth").unwrap().run(&set, &dynamic(&img)).unwrap();

    assert_exact_rectangles(&img, &outcome.image, &[BoundingBox::new(85, 95, 30, 15)], Color::RED);
}

/// Ignores the region it is given and always reports the same box
struct Rogue(BoundingBox);

impl Detector for Rogue {
    fn detect(&self, _: &RegionView<'_>, _: &DetectionParameters) -> Result<Vec<BoundingBox>, DetectError> {
        Ok(vec![self.0])
    }
}

/// Fails every call, like a backend whose model went bad
struct Broken;

impl Detector for Broken {
    fn detect(&self, _: &RegionView<'_>, _: &DetectionParameters) -> Result<Vec<BoundingBox>, DetectError> {
        Err(DetectError::Backend("model unusable".into()))
    }
}

#[test]
fn scoped_hits_outside_the_parent_are_dropped() {
    let img = plain_image(200, 200);
    let set = detectors(&[(Target::Face, ScriptedDetector::new(vec![BoundingBox::new(10, 10, 50, 50)]))])
        .with(Target::Eyes, std::sync::Arc::new(Rogue(BoundingBox::new(30, 30, 40, 40))));

    let outcome = resolve("eyes").unwrap().run(&set, &dynamic(&img)).unwrap();

    assert_eq!(outcome.count(Target::Eyes), 0);
    assert_eq!(outcome.image, img);
}

#[test]
fn hits_past_the_coordinate_range_are_dropped() {
    let img = face_image();
    let huge = BoundingBox::new(u32::MAX - 1, 0, 10, 10);
    let set = DetectorSet::new().with(Target::Face, std::sync::Arc::new(Rogue(huge)));

    let outcome = resolve("face").unwrap().run(&set, &dynamic(&img)).unwrap();

    assert!(outcome.regions.is_empty());
    assert!(outcome.scoped_skipped());
    assert_eq!(outcome.image, img);
}

#[test]
fn scoped_hits_that_overflow_once_offset_are_dropped() {
    let img = plain_image(200, 200);
    let set = detectors(&[(Target::Face, ScriptedDetector::new(vec![BoundingBox::new(10, 10, 50, 50)]))])
        .with(Target::Mouth, std::sync::Arc::new(Rogue(BoundingBox::new(u32::MAX - 5, 2, 4, 4))));

    let outcome = resolve("mouth").unwrap().run(&set, &dynamic(&img)).unwrap();

    assert_eq!(outcome.count(Target::Mouth), 0);
    assert_eq!(outcome.image, img);
}

#[test]
fn detector_failure_aborts_the_run() {
    let set = DetectorSet::new().with(Target::UpperBody, std::sync::Arc::new(Broken));
    let err = resolve("upperbody").unwrap().run(&set, &dynamic(&face_image())).unwrap_err();
    assert!(matches!(err, DetectError::Backend(_)));
}

#[test]
fn upperbody_draws_two_orange_rectangles() {
    let img = plain_image(320, 240);
    let bodies = vec![BoundingBox::new(20, 30, 90, 150), BoundingBox::new(180, 40, 100, 160)];
    let set = detectors(&[(Target::UpperBody, ScriptedDetector::new(bodies.clone()))]);

    let outcome = resolve("upperbody").unwrap().run(&set, &dynamic(&img)).unwrap();

    assert_exact_rectangles(&img, &outcome.image, &bodies, Color::ORANGE);
}

#[test]
fn fullbody_draws_blue() {
    let img = plain_image(120, 200);
    let body = BoundingBox::new(30, 10, 60, 180);
    let set = detectors(&[(Target::FullBody, ScriptedDetector::new(vec![body]))]);

    let outcome = resolve("fullbody").unwrap().run(&set, &dynamic(&img)).unwrap();

    assert_exact_rectangles(&img, &outcome.image, &[body], Color::BLUE);
}

#[test]
fn scoped_stages_only_see_root_boxes() {
    let img = plain_image(200, 200);
    let face = BoundingBox::new(40, 40, 100, 100);
    let eyes = ScriptedDetector::new(vec![BoundingBox::new(10, 10, 20, 10)]);
    let mouth = ScriptedDetector::new(vec![BoundingBox::new(30, 70, 40, 15)]);
    let set = detectors(&[
        (Target::Face, ScriptedDetector::new(vec![face])),
        (Target::Eyes, eyes.clone()),
        (Target::Mouth, mouth.clone()),
    ]);

    let pipeline = Pipeline::new(
        "features",
        DetectionStage::root(Target::Face, DetectionParameters::new(1.2, 10)),
    )
    .add_stage(DetectionStage::scoped(Target::Eyes, DetectionParameters::new(1.02, 3)).drawn(Color::WHITE))
    .add_stage(DetectionStage::scoped(Target::Mouth, DetectionParameters::new(1.1, 15)).drawn(Color::RED));

    assert!(pipeline.scoped_stages().iter().all(|s| s.scope == StageScope::WithinRoot));

    let outcome = pipeline.run(&set, &dynamic(&img)).unwrap();

    assert_eq!(eyes.regions(), vec![face]);
    assert_eq!(mouth.regions(), vec![face]);
    let targets: Vec<Target> = outcome.detections.iter().map(|d| d.target).collect();
    assert_eq!(targets, vec![Target::Eyes, Target::Mouth]);
}

#[test]
fn debug_mode_writes_step_images() {
    let dir = tempfile::TempDir::new().unwrap();
    let debug_dir = dir.path().join("debug");
    let set = detectors(&[
        (Target::Face, ScriptedDetector::new(vec![BoundingBox::new(60, 40, 80, 80)])),
        (Target::Eyes, ScriptedDetector::none()),
    ]);

    let pipeline = resolve("eyes").unwrap().with_debug(debug_dir.clone()).unwrap();
    pipeline.run(&set, &dynamic(&face_image())).unwrap();

    assert!(debug_dir.join("00_input/01.png").exists());
    let crop = image::open(debug_dir.join("01_face/01.png")).unwrap();
    assert_eq!((crop.width(), crop.height()), (80, 80));
    assert!(debug_dir.join("03_annotated/01.png").exists());
}
