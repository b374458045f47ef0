mod common;
use common::*;

use digitpad::detection::annotate::{AnnotationStyle, annotate};
use digitpad::detection::{SEGMENTATION_STEPS, build_standard_pipeline};
use image::{DynamicImage, Rgb};
use std::sync::Arc;

#[test]
fn test_single_square_end_to_end() -> anyhow::Result<()> {
    let mut ctx = DrawingContext::default();
    scribble_square(&mut ctx, 226, 226, 60);

    let stub = Arc::new(StubClassifier::answering(3));
    let recognizer = DigitRecognizer::new(stub.clone());
    let predictions = recognizer.recognize(ctx.canvas())?;

    assert_eq!(predictions.len(), 1);
    let (cx, cy) = predictions[0].bbox.center();
    assert!((cx - 256.0).abs() <= 2.0, "centre x {}", cx);
    assert!((cy - 256.0).abs() <= 2.0, "centre y {}", cy);
    assert!(predictions[0].digit <= 9);
    assert_eq!(predictions[0].digit, 3);
    assert_eq!(stub.calls(), 1);
    Ok(())
}

#[test]
fn test_every_blob_gets_one_inference_of_fixed_shape() -> anyhow::Result<()> {
    let mut canvas = blank_canvas();
    paint_block(&mut canvas, 30, 30, 8, 60);
    paint_block(&mut canvas, 200, 40, 90, 12);
    paint_block(&mut canvas, 400, 400, 100, 100);

    let stub = Arc::new(StubClassifier::answering(1));
    let predictions = DigitRecognizer::new(stub.clone()).recognize(&canvas)?;

    assert_eq!(predictions.len(), 3);
    assert_eq!(stub.calls(), 3);
    assert!(stub.shapes().iter().all(|s| s == &vec![1, 1, 28, 28]));
    assert!(predictions.iter().all(|p| p.digit == 1 && p.label() == "Prediction: 1"));
    Ok(())
}

#[test]
fn test_edge_blobs_use_both_crop_policies() -> anyhow::Result<()> {
    let mut canvas = blank_canvas();
    paint_block(&mut canvas, 0, 200, 6, 80);
    paint_block(&mut canvas, 506, 40, 6, 80);
    paint_block(&mut canvas, 200, 0, 80, 6);
    paint_block(&mut canvas, 200, 506, 80, 6);

    for policy in [CropPolicy::Pad, CropPolicy::Clamp] {
        for rule in [SquareRule::LongestSide, SquareRule::Height] {
            let stub = Arc::new(StubClassifier::answering(5));
            let config = RecognizerConfig::default()
                .with_crop_policy(policy)
                .with_square_rule(rule);
            let predictions = DigitRecognizer::new(stub.clone())
                .with_config(config)
                .recognize(&canvas)?;

            assert_eq!(predictions.len(), 4, "{:?} {:?}", policy, rule);
            assert!(stub.shapes().iter().all(|s| s == &vec![1, 1, 28, 28]));
        }
    }
    Ok(())
}

#[test]
fn test_nan_scores_still_label_every_blob() -> anyhow::Result<()> {
    let mut canvas = blank_canvas();
    paint_block(&mut canvas, 60, 60, 30, 30);
    paint_block(&mut canvas, 300, 300, 30, 30);

    let predictions = DigitRecognizer::new(Arc::new(FixedScores(vec![f32::NAN; 10])))
        .recognize(&canvas)?;

    assert_eq!(predictions.len(), 2);
    assert!(predictions.iter().all(|p| p.digit == 0));
    Ok(())
}

#[test]
fn test_classifier_errors_propagate() {
    let mut canvas = blank_canvas();
    paint_block(&mut canvas, 100, 100, 30, 30);

    let result = DigitRecognizer::new(Arc::new(BrokenClassifier)).recognize(&canvas);

    let err = result.err().expect("recognition should fail");
    assert!(format!("{:#}", err).contains("model exploded"));
}

#[test]
fn test_partial_run_stops_after_segmentation() -> anyhow::Result<()> {
    let mut canvas = blank_canvas();
    paint_block(&mut canvas, 100, 100, 30, 30);

    let stub = Arc::new(StubClassifier::answering(0));
    let pipeline = build_standard_pipeline(&RecognizerConfig::default(), stub.clone(), false);
    assert_eq!(pipeline.step_names()[SEGMENTATION_STEPS - 1], "Contour Detection");

    let regions = pipeline.run_partial(DynamicImage::ImageRgb8(canvas), SEGMENTATION_STEPS)?;

    assert_eq!(regions.len(), 1);
    assert!(regions[0].mask.is_some());
    assert_eq!(regions[0].get_int("blob_index"), Some(0));
    assert_eq!(stub.calls(), 0);
    Ok(())
}

#[test]
fn test_debug_output_dumps_every_stage() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let debug_dir = dir.path().join("debug");
    let mut canvas = blank_canvas();
    paint_block(&mut canvas, 100, 100, 30, 30);
    paint_block(&mut canvas, 300, 300, 30, 30);

    DigitRecognizer::new(Arc::new(StubClassifier::answering(2)))
        .with_debug(debug_dir.clone())
        .recognize(&canvas)?;

    assert!(debug_dir.join("00_input/01.png").exists());
    assert!(debug_dir.join("03_threshold/01.png").exists());
    assert!(debug_dir.join("05_contour_detection/02.png").exists());
    let resized = image::open(debug_dir.join("07_resize/01.png"))?;
    assert_eq!((resized.width(), resized.height()), (28, 28));
    assert!(debug_dir.join("08_digit_classification/02.png").exists());
    Ok(())
}

#[test]
fn test_debug_dir_must_be_empty() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    std::fs::write(dir.path().join("leftover.txt"), "x")?;

    let result = DigitRecognizer::new(Arc::new(StubClassifier::answering(2)))
        .with_debug(dir.path().to_path_buf())
        .recognize(&blank_canvas());

    assert!(result.is_err());
    Ok(())
}

#[test]
fn test_annotation_draws_box_and_label() {
    let canvas = blank_canvas();
    let prediction = DigitPrediction {
        bbox: BoundingBox { x: 100, y: 100, width: 50, height: 60 },
        digit: 7,
        score: 0.9,
    };
    let style = AnnotationStyle::default();

    let annotated = annotate(&canvas, &[prediction], &style);

    // Outline, three pixels thick, growing outwards
    assert_eq!(annotated.get_pixel(100, 130), &style.color);
    assert_eq!(annotated.get_pixel(98, 130), &style.color);
    assert_eq!(annotated.get_pixel(97, 130), &Rgb([0, 0, 0]));
    assert_eq!(annotated.get_pixel(125, 130), &Rgb([0, 0, 0]));
    // "7": top bar of the glyph sits 30 px above the box (10 px margin + 20 px glyph)
    assert_eq!(annotated.get_pixel(101, 70), &style.color);
    assert_eq!(annotated.get_pixel(109, 70), &style.color);
    // canvas itself untouched
    assert_eq!(ink_count(&canvas), 0);
}

#[test]
fn test_annotation_label_clamped_to_top_edge() {
    let canvas = blank_canvas();
    let prediction = DigitPrediction {
        bbox: BoundingBox { x: 20, y: 5, width: 40, height: 40 },
        digit: 1,
        score: 0.5,
    };
    let style = AnnotationStyle::default();

    let annotated = annotate(&canvas, &[prediction], &style);

    // "1" has its centre column lit on every row
    assert_eq!(annotated.get_pixel(25, 1), &style.color);
}
