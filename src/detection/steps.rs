use crate::pipeline::{PipelineData, PipelineStep, PipelineContext, MetadataValue};
use crate::detection::{preprocessing, contours, normalize, classifier::Classifier};
use crate::detection::preprocessing::Kernel;
use crate::detection::normalize::{CropPolicy, SquareRule};
use crate::models::DigitPrediction;
use anyhow::Result;
use image::DynamicImage;
use std::sync::Arc;

/// Photometric inversion of the canvas
pub struct InvertStep;

impl PipelineStep for InvertStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        Ok(data
            .into_iter()
            .map(|item| item.with_image(preprocessing::invert(&item.image)))
            .collect())
    }

    fn name(&self) -> &str {
        "Invert"
    }
}

/// Convert image to grayscale
pub struct GrayscaleStep;

impl PipelineStep for GrayscaleStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let mut result = Vec::new();
        for item in data {
            let gray = preprocessing::to_grayscale(&item.image);
            result.push(item.with_image(DynamicImage::ImageLuma8(gray)));
        }
        Ok(result)
    }

    fn name(&self) -> &str {
        "Grayscale Conversion"
    }
}

/// Inverted binary threshold. The result is also kept as the item's mask
/// so later steps can crop undilated ink from it.
pub struct ThresholdStep {
    pub threshold: u8,
}

impl PipelineStep for ThresholdStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let mut result = Vec::new();
        for item in data {
            let binary = preprocessing::binarize(&item.image.to_luma8(), self.threshold);
            let mut new_item = item.with_image(DynamicImage::ImageLuma8(binary.clone()));
            new_item.mask = Some(Arc::new(binary));
            result.push(new_item);
        }
        Ok(result)
    }

    fn name(&self) -> &str {
        "Threshold"
    }
}

/// Morphological dilation so strokes of one digit merge into one blob
pub struct DilateStep {
    pub kernel: Kernel,
    pub iterations: u8,
}

impl PipelineStep for DilateStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let mut result = Vec::new();
        for item in data {
            let dilated = preprocessing::dilate(&item.image.to_luma8(), self.kernel, self.iterations);
            result.push(item.with_image(DynamicImage::ImageLuma8(dilated)));
        }
        Ok(result)
    }

    fn name(&self) -> &str {
        "Dilation"
    }
}

/// Find external contours - splits one image into one item per blob
pub struct ContourDetectionStep;

impl PipelineStep for ContourDetectionStep {
    fn process(&self, data: Vec<PipelineData>, context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let mut result = Vec::new();

        for item in data {
            let dilated = item.image.to_luma8();
            let boxes = contours::find_blob_boxes(&dilated);

            if context.verbose {
                log::info!("Found {} blobs", boxes.len());
            }

            for (i, bbox) in boxes.into_iter().enumerate() {
                let cropped = item.image.crop_imm(bbox.x, bbox.y, bbox.width, bbox.height);
                let region = PipelineData::from_region(
                    cropped,
                    item.original.clone(),
                    item.mask.clone(),
                    bbox,
                )
                .with_metadata("blob_index", MetadataValue::Int(i as i32));
                result.push(region);
            }
        }

        Ok(result)
    }

    fn name(&self) -> &str {
        "Contour Detection"
    }
}

/// Cut a square sample around each blob out of the threshold mask
pub struct SquareCropStep {
    pub rule: SquareRule,
    pub policy: CropPolicy,
}

impl PipelineStep for SquareCropStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let mut result = Vec::new();

        for item in data {
            let mask = item.mask.as_ref()
                .ok_or_else(|| anyhow::anyhow!("Missing threshold mask; run a threshold step first"))?;
            let bbox = item.bbox
                .ok_or_else(|| anyhow::anyhow!("Missing bounding box; run contour detection first"))?;

            let region = normalize::square_region(&bbox, self.rule);
            let crop = normalize::crop_square(mask, region, self.policy)?;
            result.push(item.with_image(DynamicImage::ImageLuma8(crop)));
        }

        Ok(result)
    }

    fn name(&self) -> &str {
        "Square Crop"
    }
}

/// Resize each sample to the classifier's input resolution
pub struct ResizeStep {
    pub size: u32,
}

impl PipelineStep for ResizeStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let mut result = Vec::new();
        for item in data {
            let resized = normalize::resize_to_input(&item.image.to_luma8(), self.size);
            result.push(item.with_image(DynamicImage::ImageLuma8(resized)));
        }
        Ok(result)
    }

    fn name(&self) -> &str {
        "Resize"
    }
}

/// Run the digit classifier on every sample and record the arg-max class
pub struct ClassifyStep {
    pub classifier: Arc<dyn Classifier>,
    pub pixel_scale: f32,
}

impl PipelineStep for ClassifyStep {
    fn process(&self, data: Vec<PipelineData>, context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let mut result = Vec::new();

        for item in data {
            let tensor = normalize::to_input_tensor(&item.image.to_luma8(), self.pixel_scale);
            let (class, score) = self.classifier.predict(&tensor)?;

            if context.verbose {
                if let Some(bbox) = &item.bbox {
                    log::info!("  Blob at ({}, {}) {}x{} → {} (score {:.3})",
                        bbox.x, bbox.y, bbox.width, bbox.height, class, score);
                }
            }

            result.push(item
                .with_metadata("digit", MetadataValue::Int(class as i32))
                .with_metadata("score", MetadataValue::Float(score)));
        }

        Ok(result)
    }

    fn name(&self) -> &str {
        "Digit Classification"
    }
}

/// Read back what `ClassifyStep` recorded
pub fn prediction_from(item: &PipelineData) -> Option<DigitPrediction> {
    let bbox = item.bbox?;
    let digit = u8::try_from(item.get_int("digit")?).ok()?;
    let score = item.get_float("score")?;
    Some(DigitPrediction { bbox, digit, score })
}
