//! Raster skeletonization: approximate the medial axis of a water mask.
//!
//! The skeleton is the set of ridge points of the distance field of the
//! opened mask:
//!
//! 1. Opening (erosion then dilation) removes specks and thin protrusions.
//! 2. Euclidean distance transform: distance from each water pixel to land.
//! 3. Square-window maximum of the distance field.
//! 4. A water pixel is a skeleton pixel when its distance equals the
//!    window maximum.
//!
//! No connectivity-preserving thinning is applied. Ties are kept, so
//! flat plateaus of the distance field (e.g. an even-width channel, or a
//! window smaller than the channel's half-width) produce ridges more than
//! one pixel wide. The vectorizer follows a single path through such runs.

use crate::distance::{distance_transform, local_max};
use crate::morphology::open;
use crate::types::{BinaryMask, DistanceField, FOREGROUND, GrayImage, SkeletonMask};

/// Skeletonization with every intermediate raster preserved.
#[derive(Debug, Clone)]
pub struct StagedSkeleton {
    /// Step 1: the opened mask.
    pub opened: BinaryMask,
    /// Step 2: distance from each opened-water pixel to land.
    pub distance: DistanceField,
    /// Step 3: window maximum of `distance`.
    pub local_max: DistanceField,
    /// Step 4: ridge pixels.
    pub skeleton: SkeletonMask,
}

/// Extract the skeleton of `mask`.
///
/// An empty mask yields an empty skeleton; this is not an error.
#[must_use = "returns the skeleton mask"]
pub fn skeletonize(
    mask: &BinaryMask,
    erode_radius: u32,
    dilate_radius: u32,
    local_max_window: u32,
) -> SkeletonMask {
    skeletonize_staged(mask, erode_radius, dilate_radius, local_max_window).skeleton
}

/// Extract the skeleton of `mask`, keeping the intermediate rasters.
#[must_use = "returns the staged skeleton"]
pub fn skeletonize_staged(
    mask: &BinaryMask,
    erode_radius: u32,
    dilate_radius: u32,
    local_max_window: u32,
) -> StagedSkeleton {
    let opened = open(mask, erode_radius, dilate_radius);
    let distance = distance_transform(&opened);
    let local_max = local_max(&distance, local_max_window);

    // Pixels outside the source mask are never skeleton, whatever the
    // dilation radius did to the opened mask.
    let ridge = GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        let d = distance.get_pixel(x, y).0[0];
        let is_ridge = d > 0.0 && d >= local_max.get_pixel(x, y).0[0] && mask.contains(x, y);
        image::Luma([if is_ridge { FOREGROUND } else { 0 }])
    });
    let skeleton = SkeletonMask::new(mask.with_image(ridge));

    StagedSkeleton {
        opened,
        distance,
        local_max,
        skeleton,
    }
}
