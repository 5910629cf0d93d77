//! Binary morphology with disk structuring elements.
//!
//! Erosion and dilation are expressed as thresholds on exact Euclidean
//! distance fields, which gives true disk-shaped kernels of any radius
//! without iterating over kernel offsets:
//!
//! - erosion by `r` keeps a pixel iff its nearest land pixel is further
//!   than `r` away;
//! - dilation by `r` sets a pixel iff some water pixel is within `r`.

use crate::distance::{squared_distance_to_background, squared_distance_to_foreground};
use crate::types::{BinaryMask, DistanceField, FOREGROUND, GrayImage};

/// Erode `mask` with a disk of the given radius. Radius 0 is the identity.
///
/// The area outside the grid counts as land, so water touching the
/// border is eroded from that side too.
#[must_use = "returns the eroded mask"]
pub fn erode(mask: &BinaryMask, radius: u32) -> BinaryMask {
    let limit = f64::from(radius).powi(2);
    let field = squared_distance_to_background(mask);
    threshold(mask, &field, |d| d > limit)
}

/// Dilate `mask` with a disk of the given radius. Radius 0 is the identity.
#[must_use = "returns the dilated mask"]
pub fn dilate(mask: &BinaryMask, radius: u32) -> BinaryMask {
    let limit = f64::from(radius).powi(2);
    let field = squared_distance_to_foreground(mask);
    threshold(mask, &field, |d| d <= limit)
}

/// Morphological opening: erosion followed by dilation.
///
/// Removes protrusions and specks narrower than the erosion disk. This is
/// step 1 of skeletonization; the opened mask is always a subset of the
/// input when both radii are equal.
#[must_use = "returns the opened mask"]
pub fn open(mask: &BinaryMask, erode_radius: u32, dilate_radius: u32) -> BinaryMask {
    dilate(&erode(mask, erode_radius), dilate_radius)
}

fn threshold(
    mask: &BinaryMask,
    field: &DistanceField,
    keep: impl Fn(f64) -> bool,
) -> BinaryMask {
    let image = GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        image::Luma([if keep(field.get_pixel(x, y).0[0]) {
            FOREGROUND
        } else {
            0
        }])
    });
    mask.with_image(image)
}
