pub mod preprocessing;
pub mod contours;
pub mod normalize;
pub mod classifier;
pub mod annotate;
pub mod steps;

use anyhow::Result;
use image::{DynamicImage, GrayImage, RgbImage};
use rten_tensor::NdTensor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::models::DigitPrediction;
use crate::pipeline::{BoundingBox, Pipeline};
use self::classifier::Classifier;
use self::normalize::{CropPolicy, SquareRule};
use self::preprocessing::Kernel;
use self::steps::*;

/// Steps of the standard pipeline up to and including contour detection
pub const SEGMENTATION_STEPS: usize = 5;

/// Parameters for turning a canvas into blob boxes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentationParams {
    /// Gray level above which a pixel of the inverted canvas is background
    pub threshold: u8,
    pub kernel: Kernel,
    pub dilation_iterations: u8,
}

impl Default for SegmentationParams {
    fn default() -> Self {
        Self {
            threshold: 150,
            kernel: Kernel::Cross,
            dilation_iterations: 13,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecognizerConfig {
    pub segmentation: SegmentationParams,
    pub square_rule: SquareRule,
    pub crop_policy: CropPolicy,
    /// Side of the classifier's square input
    pub input_size: u32,
    pub pixel_scale: f32,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            segmentation: SegmentationParams::default(),
            square_rule: SquareRule::default(),
            crop_policy: CropPolicy::default(),
            input_size: 28,
            pixel_scale: 1.0,
        }
    }
}

impl RecognizerConfig {
    pub fn with_square_rule(mut self, rule: SquareRule) -> Self {
        self.square_rule = rule;
        self
    }

    pub fn with_crop_policy(mut self, policy: CropPolicy) -> Self {
        self.crop_policy = policy;
        self
    }

    pub fn with_segmentation(mut self, segmentation: SegmentationParams) -> Self {
        self.segmentation = segmentation;
        self
    }
}

/// Build the canvas → predictions pipeline
pub fn build_standard_pipeline(
    config: &RecognizerConfig,
    classifier: Arc<dyn Classifier>,
    verbose: bool,
) -> Pipeline {
    let seg = config.segmentation;

    Pipeline::new()
        .with_verbose(verbose)
        .add_step(Arc::new(InvertStep))
        .add_step(Arc::new(GrayscaleStep))
        .add_step(Arc::new(ThresholdStep { threshold: seg.threshold }))
        .add_step(Arc::new(DilateStep {
            kernel: seg.kernel,
            iterations: seg.dilation_iterations,
        }))
        .add_step(Arc::new(ContourDetectionStep))
        .add_step(Arc::new(SquareCropStep {
            rule: config.square_rule,
            policy: config.crop_policy,
        }))
        .add_step(Arc::new(ResizeStep { size: config.input_size }))
        .add_step(Arc::new(ClassifyStep {
            classifier,
            pixel_scale: config.pixel_scale,
        }))
}

/// Finds drawn digits on a canvas and classifies them.
/// Holds the classifier for the life of the program, so the model is loaded once.
pub struct DigitRecognizer {
    classifier: Arc<dyn Classifier>,
    config: RecognizerConfig,
    verbose: bool,
    debug_dir: Option<PathBuf>,
}

impl DigitRecognizer {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self {
            classifier,
            config: RecognizerConfig::default(),
            verbose: false,
            debug_dir: None,
        }
    }

    /// Load the model from `dir` and take the input geometry from its structure file
    pub fn from_model_dir(dir: &Path) -> Result<Self> {
        let model = classifier::load_model(dir)?;
        let structure = model.structure().clone();
        let config = RecognizerConfig {
            input_size: structure.input_size,
            pixel_scale: structure.pixel_scale,
            ..RecognizerConfig::default()
        };
        Ok(Self::new(Arc::new(model)).with_config(config))
    }

    pub fn with_config(mut self, config: RecognizerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Dump every pipeline stage under `dir`; the directory must be empty or absent
    /// when `recognize` runs.
    pub fn with_debug(mut self, dir: PathBuf) -> Self {
        self.debug_dir = Some(dir);
        self
    }

    fn pipeline(&self) -> Result<Pipeline> {
        let pipeline = build_standard_pipeline(&self.config, self.classifier.clone(), self.verbose);
        match &self.debug_dir {
            Some(dir) => pipeline.with_debug(dir.clone()),
            None => Ok(pipeline),
        }
    }

    /// Bounding boxes of the ink blobs on `canvas`, in contour order
    pub fn segment(&self, canvas: &RgbImage) -> Result<Vec<BoundingBox>> {
        let pipeline = build_standard_pipeline(&self.config, self.classifier.clone(), false);
        let regions = pipeline.run_partial(DynamicImage::ImageRgb8(canvas.clone()), SEGMENTATION_STEPS)?;
        Ok(regions.iter().filter_map(|r| r.bbox).collect())
    }

    /// Threshold mask of `canvas`, the image samples are cropped from
    pub fn ink_mask(&self, canvas: &RgbImage) -> GrayImage {
        let inverted = preprocessing::invert(&DynamicImage::ImageRgb8(canvas.clone()));
        let gray = preprocessing::to_grayscale(&inverted);
        preprocessing::binarize(&gray, self.config.segmentation.threshold)
    }

    /// Classifier input for the blob in `bbox`
    pub fn normalize(&self, mask: &GrayImage, bbox: &BoundingBox) -> Result<NdTensor<f32, 4>> {
        normalize::normalize_blob(
            mask,
            bbox,
            self.config.square_rule,
            self.config.crop_policy,
            self.config.input_size,
            self.config.pixel_scale,
        )
    }

    /// Segment, normalize and classify every blob on `canvas`
    pub fn recognize(&self, canvas: &RgbImage) -> Result<Vec<DigitPrediction>> {
        let results = self.pipeline()?.run(DynamicImage::ImageRgb8(canvas.clone()))?;
        let predictions: Vec<DigitPrediction> = results.iter().filter_map(prediction_from).collect();

        for prediction in &predictions {
            log::info!("{} at ({}, {})", prediction.label(), prediction.bbox.x, prediction.bbox.y);
        }
        if predictions.is_empty() {
            log::info!("No digits found on the canvas");
        }

        Ok(predictions)
    }
}
