use anyhow::{Context, Result};
use rten::Model;
use rten_tensor::prelude::*;
use rten_tensor::{NdTensor, Tensor};
use serde::Deserialize;
use std::path::Path;

pub const MODEL_DIR: &str = "models";
pub const STRUCTURE_FILE: &str = "model.json";
pub const WEIGHTS_FILE: &str = "model.rten";

/// Anything that scores a `[1, 1, size, size]` digit sample
pub trait Classifier: Send + Sync {
    /// One raw score per class
    fn scores(&self, input: &NdTensor<f32, 4>) -> Result<Vec<f32>>;

    /// Index and score of the best class. Never rejects a sample: if every
    /// score is NaN the first class is reported.
    fn predict(&self, input: &NdTensor<f32, 4>) -> Result<(usize, f32)> {
        let scores = self.scores(input)?;
        if scores.is_empty() {
            anyhow::bail!("Classifier returned no scores");
        }
        Ok(argmax(&scores).unwrap_or_else(|| {
            log::warn!("All {} class scores are NaN, falling back to class 0", scores.len());
            (0, scores[0])
        }))
    }
}

/// Position and value of the largest score; the first one wins ties.
/// NaN scores never win.
pub fn argmax(scores: &[f32]) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &score) in scores.iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        match best {
            Some((_, top)) if top >= score => {}
            _ => best = Some((i, score)),
        }
    }
    best
}

fn default_pixel_scale() -> f32 {
    1.0
}

fn default_weights() -> String {
    WEIGHTS_FILE.to_string()
}

/// Contents of `model.json`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelStructure {
    /// Side of the square single-channel input
    pub input_size: u32,
    pub num_classes: usize,
    /// Multiplier applied to 0-255 pixel values before inference
    #[serde(default = "default_pixel_scale")]
    pub pixel_scale: f32,
    /// Weight artifact, relative to the structure file
    #[serde(default = "default_weights")]
    pub weights: String,
}

impl ModelStructure {
    pub fn from_json(json: &str) -> Result<Self> {
        let structure: ModelStructure = serde_json::from_str(json)?;
        structure.validate()?;
        Ok(structure)
    }

    fn validate(&self) -> Result<()> {
        if self.input_size == 0 {
            anyhow::bail!("input_size must be positive");
        }
        if self.num_classes == 0 {
            anyhow::bail!("num_classes must be positive");
        }
        if !self.pixel_scale.is_finite() {
            anyhow::bail!("pixel_scale must be finite");
        }
        Ok(())
    }
}

/// The pretrained digit model, run with rten
pub struct RtenClassifier {
    model: Model,
    structure: ModelStructure,
}

impl RtenClassifier {
    pub fn structure(&self) -> &ModelStructure {
        &self.structure
    }
}

impl Classifier for RtenClassifier {
    fn scores(&self, input: &NdTensor<f32, 4>) -> Result<Vec<f32>> {
        let output = self.model
            .run_one(input.view().into(), None)
            .map_err(|e| anyhow::anyhow!("Inference failed: {}", e))?;
        let output: Tensor<f32> = output
            .try_into()
            .map_err(|e| anyhow::anyhow!("Unexpected model output: {:?}", e))?;

        let scores: Vec<f32> = output.iter().copied().collect();
        if scores.len() != self.structure.num_classes {
            anyhow::bail!(
                "Model produced {} scores, expected {}",
                scores.len(),
                self.structure.num_classes
            );
        }
        Ok(scores)
    }
}

/// Load the digit model from `dir` (normally `models/`)
pub fn load_model(dir: &Path) -> Result<RtenClassifier> {
    let structure_path = dir.join(STRUCTURE_FILE);
    if !structure_path.exists() {
        anyhow::bail!(
            "Model structure not found. Expected location:\n  - {}",
            structure_path.display()
        );
    }

    let json = std::fs::read_to_string(&structure_path)
        .with_context(|| format!("Failed to read model structure {}", structure_path.display()))?;
    let structure = ModelStructure::from_json(&json)
        .with_context(|| format!("Malformed model structure {}", structure_path.display()))?;

    let weights_path = dir.join(&structure.weights);
    if !weights_path.exists() {
        anyhow::bail!(
            "Model weights not found. Expected location:\n  - {}",
            weights_path.display()
        );
    }

    let model = Model::load_file(&weights_path)
        .map_err(|e| anyhow::anyhow!("Failed to load model weights {}: {}", weights_path.display(), e))?;

    log::info!("Loaded model from {}", dir.display());

    Ok(RtenClassifier { model, structure })
}
