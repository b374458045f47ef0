use image::{Rgb, RgbImage};
use imageproc::drawing::{BresenhamLineIter, draw_filled_circle_mut};

pub const CANVAS_WIDTH: u32 = 512;
pub const CANVAS_HEIGHT: u32 = 512;

/// Pen used for strokes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Brush {
    /// Stroke width in pixels
    pub width: u32,
    pub color: Rgb<u8>,
}

impl Default for Brush {
    fn default() -> Self {
        Self {
            width: 5,
            color: Rgb([255, 255, 255]),
        }
    }
}

/// The drawing surface plus the state of the stroke in progress.
///
/// Whoever runs the event loop owns this and hands `&mut` access to the
/// pointer handlers, one event at a time.
#[derive(Debug, Clone)]
pub struct DrawingContext {
    canvas: RgbImage,
    brush: Brush,
    drawing: bool,
    last: Option<(i32, i32)>,
    cursor: Option<(i32, i32)>,
}

impl DrawingContext {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            canvas: RgbImage::new(width, height),
            brush: Brush::default(),
            drawing: false,
            last: None,
            cursor: None,
        }
    }

    pub fn with_brush(mut self, brush: Brush) -> Self {
        self.brush = brush;
        self
    }

    pub fn canvas(&self) -> &RgbImage {
        &self.canvas
    }

    pub fn is_drawing(&self) -> bool {
        self.drawing
    }

    pub fn last_point(&self) -> Option<(i32, i32)> {
        self.last
    }

    /// Button down: start a stroke at (x, y). Draws nothing by itself.
    pub fn press(&mut self, x: i32, y: i32) {
        self.drawing = true;
        self.last = Some((x, y));
        self.cursor = Some((x, y));
    }

    /// Button down at the last hovered position, if the pointer has been seen
    pub fn press_at_cursor(&mut self) -> bool {
        match self.cursor {
            Some((x, y)) => {
                self.press(x, y);
                true
            }
            None => false,
        }
    }

    /// Pointer moved without being interpreted as a stroke
    pub fn hover(&mut self, x: i32, y: i32) {
        self.cursor = Some((x, y));
    }

    /// Pointer moved: extends the stroke while the button is held.
    /// Returns whether any pixels were drawn.
    pub fn move_to(&mut self, x: i32, y: i32) -> bool {
        self.cursor = Some((x, y));
        if !self.drawing {
            return false;
        }
        let from = self.last.unwrap_or((x, y));
        self.draw_segment(from, (x, y));
        self.last = Some((x, y));
        true
    }

    /// Button up
    pub fn release(&mut self) {
        self.drawing = false;
        self.last = None;
    }

    /// Wipe the canvas back to black and drop any stroke in progress
    pub fn clear(&mut self) {
        let (w, h) = self.canvas.dimensions();
        self.canvas = RgbImage::new(w, h);
        self.release();
    }

    fn draw_segment(&mut self, from: (i32, i32), to: (i32, i32)) {
        let radius = (self.brush.width / 2) as i32;
        let start = (from.0 as f32, from.1 as f32);
        let end = (to.0 as f32, to.1 as f32);
        for point in BresenhamLineIter::new(start, end) {
            draw_filled_circle_mut(&mut self.canvas, point, radius, self.brush.color);
        }
    }
}

impl Default for DrawingContext {
    fn default() -> Self {
        Self::new(CANVAS_WIDTH, CANVAS_HEIGHT)
    }
}
