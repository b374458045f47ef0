pub mod canvas;
pub mod detection;
pub mod models;
pub mod pipeline;

pub use canvas::{Brush, DrawingContext};
pub use models::DigitPrediction;
pub use detection::{DigitRecognizer, RecognizerConfig, SegmentationParams};
pub use pipeline::{
    Pipeline, PipelineData, PipelineStep, PipelineContext,
    BoundingBox, MetadataValue, DebugConfig
};

#[cfg(feature = "gui")]
pub mod gui;
