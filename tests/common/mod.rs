#![allow(dead_code)]

mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from digitpad for tests
pub use digitpad::{BoundingBox, DigitPrediction, DigitRecognizer, DrawingContext, RecognizerConfig};
pub use digitpad::detection::normalize::{CropPolicy, SquareRule};
