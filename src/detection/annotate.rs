use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use crate::models::DigitPrediction;

const GLYPH_WIDTH: u32 = 3;
const GLYPH_HEIGHT: u32 = 5;

// 3x5 digit font, one row per entry, most significant bit on the left
const DIGIT_GLYPHS: [[u8; 5]; 10] = [
    [0b111, 0b101, 0b101, 0b101, 0b111],
    [0b010, 0b110, 0b010, 0b010, 0b111],
    [0b111, 0b001, 0b111, 0b100, 0b111],
    [0b111, 0b001, 0b111, 0b001, 0b111],
    [0b101, 0b101, 0b111, 0b001, 0b001],
    [0b111, 0b100, 0b111, 0b001, 0b111],
    [0b111, 0b100, 0b111, 0b101, 0b111],
    [0b111, 0b001, 0b001, 0b001, 0b001],
    [0b111, 0b101, 0b111, 0b101, 0b111],
    [0b111, 0b101, 0b111, 0b001, 0b111],
];

/// Gap between a box and the label above it
const LABEL_MARGIN: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnotationStyle {
    pub color: Rgb<u8>,
    /// Box outline thickness in pixels
    pub thickness: u32,
    /// Size of one glyph cell in pixels
    pub label_scale: u32,
}

impl Default for AnnotationStyle {
    fn default() -> Self {
        Self {
            color: Rgb([0, 255, 0]),
            thickness: 3,
            label_scale: 4,
        }
    }
}

/// Copy of `canvas` with every prediction's box and digit drawn on it
pub fn annotate(canvas: &RgbImage, predictions: &[DigitPrediction], style: &AnnotationStyle) -> RgbImage {
    let mut display = canvas.clone();

    for prediction in predictions {
        let bbox = prediction.bbox;
        for t in 0..style.thickness {
            let rect = Rect::at(bbox.x as i32 - t as i32, bbox.y as i32 - t as i32)
                .of_size(bbox.width + 2 * t, bbox.height + 2 * t);
            draw_hollow_rect_mut(&mut display, rect, style.color);
        }

        let label_height = GLYPH_HEIGHT * style.label_scale;
        let label_y = bbox.y.saturating_sub(LABEL_MARGIN + label_height);
        draw_digits(&mut display, &prediction.digit.to_string(), bbox.x, label_y, style);
    }

    display
}

/// Render the ASCII digits of `text` with the built-in font; other characters are skipped
pub fn draw_digits(image: &mut RgbImage, text: &str, x: u32, y: u32, style: &AnnotationStyle) {
    let scale = style.label_scale.max(1);
    let advance = (GLYPH_WIDTH + 1) * scale;

    for (i, digit) in text.chars().filter_map(|c| c.to_digit(10)).enumerate() {
        let origin_x = x + i as u32 * advance;
        for (row, bits) in DIGIT_GLYPHS[digit as usize].iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                    continue;
                }
                let cell = Rect::at((origin_x + col * scale) as i32, (y + row as u32 * scale) as i32)
                    .of_size(scale, scale);
                draw_filled_rect_mut(image, cell, style.color);
            }
        }
    }
}
