use digitpad::DrawingContext;
use digitpad::detection::classifier::Classifier;
use image::{Rgb, RgbImage};
use rten_tensor::NdTensor;
use rten_tensor::prelude::*;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const INK: Rgb<u8> = Rgb([255, 255, 255]);

/// Classifier that always favours one class and remembers what it was asked
pub struct StubClassifier {
    answer: usize,
    calls: AtomicUsize,
    shapes: Mutex<Vec<Vec<usize>>>,
}

impl StubClassifier {
    pub fn answering(answer: usize) -> Self {
        Self {
            answer,
            calls: AtomicUsize::new(0),
            shapes: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn shapes(&self) -> Vec<Vec<usize>> {
        self.shapes.lock().unwrap().clone()
    }
}

impl Classifier for StubClassifier {
    fn scores(&self, input: &NdTensor<f32, 4>) -> anyhow::Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.shapes.lock().unwrap().push(input.shape().to_vec());
        let mut scores = vec![0.01; 10];
        scores[self.answer] = 0.9;
        Ok(scores)
    }
}

/// Classifier that hands back a fixed score vector
pub struct FixedScores(pub Vec<f32>);

impl Classifier for FixedScores {
    fn scores(&self, _input: &NdTensor<f32, 4>) -> anyhow::Result<Vec<f32>> {
        Ok(self.0.clone())
    }
}

/// Classifier whose inference always fails
pub struct BrokenClassifier;

impl Classifier for BrokenClassifier {
    fn scores(&self, _input: &NdTensor<f32, 4>) -> anyhow::Result<Vec<f32>> {
        anyhow::bail!("model exploded")
    }
}

/// Black 512x512 canvas
pub fn blank_canvas() -> RgbImage {
    DrawingContext::default().canvas().clone()
}

/// Paint a solid block of ink
pub fn paint_block(canvas: &mut RgbImage, x: u32, y: u32, width: u32, height: u32) {
    for py in y..(y + height).min(canvas.height()) {
        for px in x..(x + width).min(canvas.width()) {
            canvas.put_pixel(px, py, INK);
        }
    }
}

/// Fill a square by dragging horizontal strokes across it, two rows apart
pub fn scribble_square(ctx: &mut DrawingContext, left: i32, top: i32, side: i32) {
    for y in (top..=top + side).step_by(2) {
        ctx.press(left, y);
        ctx.move_to(left + side, y);
        ctx.release();
    }
}

pub fn is_ink(canvas: &RgbImage, x: u32, y: u32) -> bool {
    canvas.get_pixel(x, y) == &INK
}

pub fn ink_count(canvas: &RgbImage) -> usize {
    canvas.pixels().filter(|p| **p == INK).count()
}
