use iced::widget::image::Handle;
use image::{DynamicImage, RgbImage};

use crate::canvas::DrawingContext;

#[derive(Debug, Clone)]
pub enum Phase {
    Drawing,
    Results {
        annotated: Handle,
        labels: Vec<String>,
    },
    Failed(String),
}

#[derive(Debug)]
pub struct AppState {
    pub drawing: DrawingContext,
    /// Upload of the canvas as last drawn
    pub canvas_handle: Handle,
    pub phase: Phase,
}

impl AppState {
    pub fn new(drawing: DrawingContext) -> Self {
        let canvas_handle = to_handle(drawing.canvas());
        Self {
            drawing,
            canvas_handle,
            phase: Phase::Drawing,
        }
    }

    pub fn refresh_canvas(&mut self) {
        self.canvas_handle = to_handle(self.drawing.canvas());
    }
}

pub fn to_handle(img: &RgbImage) -> Handle {
    let (width, height) = img.dimensions();
    let rgba = DynamicImage::ImageRgb8(img.clone()).to_rgba8();
    Handle::from_rgba(width, height, rgba.into_raw())
}
