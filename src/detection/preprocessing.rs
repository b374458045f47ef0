use image::{DynamicImage, GrayImage};
use imageproc::contrast::{ThresholdType, threshold};
use imageproc::distance_transform::Norm;
use imageproc::morphology;

/// Structuring element used for dilation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kernel {
    /// 3x3 plus sign
    Cross,
    /// 3x3 block
    Square,
}

impl Kernel {
    // Dilating k times by a 3x3 cross is dilation by an L1 ball of radius k;
    // the same holds for the 3x3 square and the L-infinity ball.
    fn norm(self) -> Norm {
        match self {
            Kernel::Cross => Norm::L1,
            Kernel::Square => Norm::LInf,
        }
    }
}

/// Photometric inversion
pub fn invert(img: &DynamicImage) -> DynamicImage {
    let mut inverted = img.clone();
    inverted.invert();
    inverted
}

/// Convert image to grayscale
pub fn to_grayscale(img: &DynamicImage) -> GrayImage {
    img.to_luma8()
}

/// Inverted binary threshold: pixels above `level` become 0, the rest 255
pub fn binarize(img: &GrayImage, level: u8) -> GrayImage {
    threshold(img, level, ThresholdType::BinaryInverted)
}

/// Grow the non-zero pixels of a binary mask by `iterations` applications of `kernel`
pub fn dilate(mask: &GrayImage, kernel: Kernel, iterations: u8) -> GrayImage {
    if iterations == 0 {
        return mask.clone();
    }
    morphology::dilate(mask, kernel.norm(), iterations)
}
