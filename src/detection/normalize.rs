use anyhow::Result;
use image::GrayImage;
use image::imageops::{self, FilterType};
use rten_tensor::NdTensor;
use crate::pipeline::BoundingBox;

/// How the square sample region is derived from a blob's bounding box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SquareRule {
    /// Side is the longer of width and height, centred on the box centre
    #[default]
    LongestSide,
    /// Side is the box height; offsets use floor division on the half sizes.
    /// Wide boxes get a square narrower than the blob.
    Height,
}

/// What to do with the part of a sample region lying outside the image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CropPolicy {
    /// Keep the full square; outside pixels read as background (0)
    #[default]
    Pad,
    /// Shrink the square to the image if needed and shift it inside the bounds
    Clamp,
}

/// A square in image coordinates; may extend past the image edges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SquareRegion {
    pub x: i64,
    pub y: i64,
    pub side: u32,
}

pub fn square_region(bbox: &BoundingBox, rule: SquareRule) -> SquareRegion {
    let (x, y) = (bbox.x as i64, bbox.y as i64);
    let (w, h) = (bbox.width as i64, bbox.height as i64);

    match rule {
        SquareRule::LongestSide => {
            let side = w.max(h);
            SquareRegion {
                x: (2 * x + w - side).div_euclid(2),
                y: (2 * y + h - side).div_euclid(2),
                side: side as u32,
            }
        }
        SquareRule::Height => SquareRegion {
            x: x + w / 2 - h / 2,
            y,
            side: h as u32,
        },
    }
}

/// Cut the region out of `mask`, bounded by `policy`
pub fn crop_square(mask: &GrayImage, region: SquareRegion, policy: CropPolicy) -> Result<GrayImage> {
    let (width, height) = mask.dimensions();
    if region.side == 0 || width == 0 || height == 0 {
        anyhow::bail!("Empty crop region {:?} on a {}x{} mask", region, width, height);
    }

    match policy {
        CropPolicy::Pad => {
            let mut out = GrayImage::new(region.side, region.side);
            imageops::replace(&mut out, mask, -region.x, -region.y);
            Ok(out)
        }
        CropPolicy::Clamp => {
            let side = region.side.min(width).min(height);
            let x = region.x.clamp(0, (width - side) as i64) as u32;
            let y = region.y.clamp(0, (height - side) as i64) as u32;
            Ok(imageops::crop_imm(mask, x, y, side, side).to_image())
        }
    }
}

/// Resize to the classifier's square input resolution
pub fn resize_to_input(img: &GrayImage, size: u32) -> GrayImage {
    imageops::resize(img, size, size, FilterType::Triangle)
}

/// Single-sample, single-channel NCHW tensor of the pixel values times `pixel_scale`
pub fn to_input_tensor(img: &GrayImage, pixel_scale: f32) -> NdTensor<f32, 4> {
    let (width, height) = img.dimensions();
    let data: Vec<f32> = img.pixels().map(|p| p[0] as f32 * pixel_scale).collect();
    NdTensor::from_data([1, 1, height as usize, width as usize], data)
}

/// Sample region → crop → resize → tensor, for one blob
pub fn normalize_blob(
    mask: &GrayImage,
    bbox: &BoundingBox,
    rule: SquareRule,
    policy: CropPolicy,
    input_size: u32,
    pixel_scale: f32,
) -> Result<NdTensor<f32, 4>> {
    let crop = crop_square(mask, square_region(bbox, rule), policy)?;
    let resized = resize_to_input(&crop, input_size);
    Ok(to_input_tensor(&resized, pixel_scale))
}
