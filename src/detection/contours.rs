use image::{GrayImage, imageops};
use imageproc::contours::{BorderType, Contour, find_contours};
use imageproc::point::Point;
use crate::pipeline::BoundingBox;

/// Outermost contours of the non-zero blobs in a binary mask.
/// Holes, and blobs nested inside holes, are skipped.
pub fn find_external_contours(mask: &GrayImage) -> Vec<Contour<i32>> {
    // Borders starting in column 0 come back as holes unless the mask has a
    // background frame; points are shifted back into mask coordinates.
    let (width, height) = mask.dimensions();
    let mut framed = GrayImage::new(width + 2, height + 2);
    imageops::replace(&mut framed, mask, 1, 1);

    find_contours::<i32>(&framed)
        .into_iter()
        .filter(|c| c.parent.is_none() && matches!(c.border_type, BorderType::Outer))
        .map(|mut c| {
            c.points = c.points.iter().map(|p| Point::new(p.x - 1, p.y - 1)).collect();
            c
        })
        .collect()
}

/// Smallest axis-aligned rectangle enclosing every point of the contour
pub fn bounding_rect(contour: &Contour<i32>) -> Option<BoundingBox> {
    let first = contour.points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);

    for p in &contour.points[1..] {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }

    Some(BoundingBox {
        x: min_x.max(0) as u32,
        y: min_y.max(0) as u32,
        width: (max_x - min_x + 1) as u32,
        height: (max_y - min_y + 1) as u32,
    })
}

/// One bounding rectangle per connected blob, in contour-finding order
pub fn find_blob_boxes(mask: &GrayImage) -> Vec<BoundingBox> {
    find_external_contours(mask)
        .iter()
        .filter_map(bounding_rect)
        .collect()
}
