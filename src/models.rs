use crate::pipeline::BoundingBox;

/// One detected blob and the digit the classifier assigned to it
#[derive(Debug, Clone, PartialEq)]
pub struct DigitPrediction {
    pub bbox: BoundingBox,
    pub digit: u8,
    /// Raw score of the winning class, as produced by the model
    pub score: f32,
}

impl DigitPrediction {
    pub fn label(&self) -> String {
        format!("Prediction: {}", self.digit)
    }
}
