//! Euclidean distance transform and square-window maximum filter.
//!
//! Wraps [`imageproc::distance_transform::euclidean_squared_distance_transform`],
//! which measures the distance to the nearest *non-zero* pixel. To measure
//! the distance from water to land the mask is inverted first, and a
//! one-pixel background frame is added so that the area outside the grid
//! counts as land.

use imageproc::distance_transform::euclidean_squared_distance_transform;

use crate::types::{BinaryMask, DistanceField, GrayImage};

/// Squared distance from every pixel to the nearest background pixel.
///
/// Background pixels have distance 0. Pixels outside the grid are treated
/// as background.
#[must_use = "returns the squared distance field"]
pub fn squared_distance_to_background(mask: &BinaryMask) -> DistanceField {
    let (width, height) = (mask.width(), mask.height());
    let framed = GrayImage::from_fn(width + 2, height + 2, |x, y| {
        let inside = x >= 1 && y >= 1 && x <= width && y <= height;
        let water = inside && mask.contains(x - 1, y - 1);
        image::Luma([if water { 0 } else { 255 }])
    });
    let squared = euclidean_squared_distance_transform(&framed);
    DistanceField::from_fn(width, height, |x, y| *squared.get_pixel(x + 1, y + 1))
}

/// Squared distance from every pixel to the nearest foreground pixel.
///
/// Foreground pixels have distance 0. An empty mask yields infinity
/// everywhere.
#[must_use = "returns the squared distance field"]
pub fn squared_distance_to_foreground(mask: &BinaryMask) -> DistanceField {
    euclidean_squared_distance_transform(mask.image())
}

/// Euclidean distance from every water pixel to the nearest land pixel.
///
/// This is step 2 of skeletonization. Land pixels are 0.
#[must_use = "returns the distance field"]
pub fn distance_transform(mask: &BinaryMask) -> DistanceField {
    let mut field = squared_distance_to_background(mask);
    for pixel in field.pixels_mut() {
        pixel.0[0] = pixel.0[0].sqrt();
    }
    field
}

/// Half-width of a square window of side `window`.
///
/// Even sides are widened by one pixel so the window stays centered.
#[must_use]
pub const fn window_half_width(window: u32) -> u32 {
    window / 2
}

/// Maximum of `field` over the square window of side `window` centered on
/// each pixel.
///
/// The window is clipped at the grid edge. Runs as two separable passes
/// (rows, then columns).
#[must_use = "returns the local maximum field"]
pub fn local_max(field: &DistanceField, window: u32) -> DistanceField {
    let half = window_half_width(window);
    let (width, height) = field.dimensions();

    let rows = DistanceField::from_fn(width, height, |x, y| {
        let lo = x.saturating_sub(half);
        let hi = x.saturating_add(half).min(width - 1);
        let max = (lo..=hi)
            .map(|xx| field.get_pixel(xx, y).0[0])
            .fold(f64::NEG_INFINITY, f64::max);
        image::Luma([max])
    });

    DistanceField::from_fn(width, height, |x, y| {
        let lo = y.saturating_sub(half);
        let hi = y.saturating_add(half).min(height - 1);
        let max = (lo..=hi)
            .map(|yy| rows.get_pixel(x, yy).0[0])
            .fold(f64::NEG_INFINITY, f64::max);
        image::Luma([max])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Georeference;

    fn band(width: u32, height: u32, rows: std::ops::Range<u32>) -> BinaryMask {
        BinaryMask::from_fn(width, height, Georeference::default(), |_, y| {
            rows.contains(&y)
        })
    }

    #[test]
    fn background_has_zero_distance() {
        let mask = band(10, 10, 3..6);
        let field = distance_transform(&mask);
        assert!(field.get_pixel(5, 0).0[0].abs() < f64::EPSILON);
        assert!(field.get_pixel(5, 9).0[0].abs() < f64::EPSILON);
    }

    #[test]
    fn band_distance_peaks_on_center_row() {
        // Rows 3..=7 are water; the nearest land is row 2 or row 8.
        let mask = band(30, 11, 3..8);
        let field = distance_transform(&mask);
        let at = |y| field.get_pixel(15, y).0[0];
        assert!((at(5) - 3.0).abs() < 1e-9);
        assert!((at(4) - 2.0).abs() < 1e-9);
        assert!((at(3) - 1.0).abs() < 1e-9);
        // Symmetric about the center row.
        assert!((at(4) - at(6)).abs() < 1e-9);
        assert!((at(3) - at(7)).abs() < 1e-9);
    }

    #[test]
    fn outside_grid_counts_as_land() {
        let mask = BinaryMask::from_fn(5, 5, Georeference::default(), |_, _| true);
        let field = distance_transform(&mask);
        assert!((field.get_pixel(0, 2).0[0] - 1.0).abs() < 1e-9);
        assert!((field.get_pixel(2, 2).0[0] - 3.0).abs() < 1e-9);
    }

    #[test]
    fn distance_to_foreground_of_empty_mask_is_infinite() {
        let mask = BinaryMask::empty(4, 4, Georeference::default());
        let field = squared_distance_to_foreground(&mask);
        assert!(field.pixels().all(|p| p.0[0].is_infinite()));
    }

    #[test]
    fn window_half_width_rounds_even_sizes_up() {
        assert_eq!(window_half_width(1), 0);
        assert_eq!(window_half_width(4), 2);
        assert_eq!(window_half_width(5), 2);
    }

    #[test]
    fn local_max_spreads_peak_within_window() {
        let mut field = DistanceField::new(7, 7);
        field.put_pixel(3, 3, image::Luma([4.0]));
        let max = local_max(&field, 3);
        assert!((max.get_pixel(2, 2).0[0] - 4.0).abs() < f64::EPSILON);
        assert!((max.get_pixel(4, 3).0[0] - 4.0).abs() < f64::EPSILON);
        assert!(max.get_pixel(1, 3).0[0].abs() < f64::EPSILON);
        assert!(max.get_pixel(5, 5).0[0].abs() < f64::EPSILON);
    }

    #[test]
    fn local_max_window_of_one_is_identity() {
        let field = DistanceField::from_fn(4, 3, |x, y| image::Luma([f64::from(x * 3 + y)]));
        let max = local_max(&field, 1);
        assert_eq!(max.as_raw(), field.as_raw());
    }

    #[test]
    fn local_max_clips_at_edges() {
        let field = DistanceField::from_fn(3, 1, |x, _| image::Luma([f64::from(x)]));
        let max = local_max(&field, 5);
        assert!(max.pixels().all(|p| (p.0[0] - 2.0).abs() < f64::EPSILON));
    }
}
