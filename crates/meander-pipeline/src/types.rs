//! Shared types for the meander centerline pipeline.

use serde::{Deserialize, Serialize};

use crate::migration::MatchingMode;
use crate::nearest::NearestSearchKind;

/// Re-export `GrayImage` so downstream crates can build masks without
/// depending on `image` directly.
pub use image::GrayImage;

/// A floating-point raster used for distance fields.
pub type DistanceField = image::ImageBuffer<image::Luma<f64>, Vec<f64>>;

/// Pixel value of a foreground (water) pixel in a [`BinaryMask`].
pub const FOREGROUND: u8 = 255;

/// A 2D point in the coordinate reference system of its source mask.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Easting (or column, on the identity grid).
    pub x: f64,
    /// Northing (or row, on the identity grid).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    ///
    /// Avoids the square root for comparison purposes.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }
}

/// An ordered sequence of points forming one open path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline(Vec<Point>);

impl Polyline {
    /// Create a new polyline from a vector of points.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Returns `true` if the polyline has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of points in the polyline.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns a slice of all points.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }
}

/// North-up affine transform from pixel indices to CRS coordinates.
///
/// ```text
/// x = origin_x + (col + 0.5) * pixel_width
/// y = origin_y + (row + 0.5) * pixel_height
/// ```
///
/// `pixel_height` is usually negative for projected rasters whose origin
/// is the upper-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// X coordinate of the upper-left corner.
    pub origin_x: f64,
    /// Y coordinate of the upper-left corner.
    pub origin_y: f64,
    /// Cell size in the X direction.
    pub pixel_width: f64,
    /// Cell size in the Y direction.
    pub pixel_height: f64,
}

impl GeoTransform {
    /// Create a transform with no rotation.
    #[must_use]
    pub const fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
        }
    }

    /// The identity grid: one unit per pixel, origin at the image corner.
    #[must_use]
    pub const fn identity() -> Self {
        Self::new(0.0, 0.0, 1.0, 1.0)
    }

    /// CRS coordinate of the center of pixel `(col, row)`.
    #[must_use]
    pub fn pixel_center(&self, col: u32, row: u32) -> Point {
        let col = f64::from(col) + 0.5;
        let row = f64::from(row) + 0.5;
        Point::new(
            col.mul_add(self.pixel_width, self.origin_x),
            row.mul_add(self.pixel_height, self.origin_y),
        )
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Georeferencing metadata attached to every mask of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Georeference {
    /// Pixel-to-CRS transform.
    pub transform: GeoTransform,
    /// Coordinate reference system identifier, e.g. `EPSG:32615`.
    pub crs: Option<String>,
}

impl Georeference {
    /// Georeference with the given transform and CRS.
    #[must_use]
    pub fn new(transform: GeoTransform, crs: Option<String>) -> Self {
        Self { transform, crs }
    }

    /// Whether the CRS identifier names a well-known geographic
    /// (degree-based) system.
    ///
    /// Distances computed in such a CRS are not linear, so migration
    /// rates would be in degrees per time unit.
    #[must_use]
    pub fn looks_geographic(&self) -> bool {
        self.crs.as_deref().is_some_and(|crs| {
            let crs = crs.to_ascii_uppercase();
            matches!(
                crs.as_str(),
                "EPSG:4326" | "EPSG:4269" | "EPSG:4258" | "OGC:CRS84" | "CRS84"
            )
        })
    }
}

/// A binary water mask over a georeferenced grid.
///
/// Foreground (river) pixels are stored as [`FOREGROUND`], background
/// pixels as 0.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryMask {
    image: GrayImage,
    georeference: Georeference,
}

impl BinaryMask {
    /// An all-background mask.
    #[must_use]
    pub fn empty(width: u32, height: u32, georeference: Georeference) -> Self {
        Self {
            image: GrayImage::new(width, height),
            georeference,
        }
    }

    /// Build a mask by evaluating `is_foreground` at every pixel.
    #[must_use]
    pub fn from_fn(
        width: u32,
        height: u32,
        georeference: Georeference,
        mut is_foreground: impl FnMut(u32, u32) -> bool,
    ) -> Self {
        let image = GrayImage::from_fn(width, height, |x, y| {
            image::Luma([if is_foreground(x, y) { FOREGROUND } else { 0 }])
        });
        Self {
            image,
            georeference,
        }
    }

    /// Build a mask from a grayscale raster. Any non-zero value is
    /// foreground.
    #[must_use]
    pub fn from_gray(gray: &GrayImage, georeference: Georeference) -> Self {
        Self::from_fn(gray.width(), gray.height(), georeference, |x, y| {
            gray.get_pixel(x, y).0[0] != 0
        })
    }

    /// Build a mask from a row-major slice of booleans.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidMask`] if `values.len()` is not
    /// `width * height`.
    pub fn from_bools(
        width: u32,
        height: u32,
        georeference: Georeference,
        values: &[bool],
    ) -> Result<Self, PipelineError> {
        let expected = u64::from(width) * u64::from(height);
        if values.len() as u64 != expected {
            return Err(PipelineError::InvalidMask(format!(
                "expected {expected} values for a {width}x{height} mask, got {}",
                values.len()
            )));
        }
        let raw = values
            .iter()
            .map(|&v| if v { FOREGROUND } else { 0 })
            .collect();
        let image = GrayImage::from_raw(width, height, raw).ok_or_else(|| {
            PipelineError::InvalidMask(format!("cannot build a {width}x{height} raster"))
        })?;
        Ok(Self {
            image,
            georeference,
        })
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Whether pixel `(x, y)` is foreground. Out-of-bounds pixels are
    /// background.
    #[must_use]
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x < self.width() && y < self.height() && self.image.get_pixel(x, y).0[0] != 0
    }

    /// Number of foreground pixels.
    #[must_use]
    pub fn foreground_count(&self) -> usize {
        self.image.as_raw().iter().filter(|&&v| v != 0).count()
    }

    /// Returns `true` if no pixel is foreground.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.image.as_raw().iter().all(|&v| v == 0)
    }

    /// The underlying 8-bit raster.
    #[must_use]
    pub const fn image(&self) -> &GrayImage {
        &self.image
    }

    /// Georeferencing metadata.
    #[must_use]
    pub const fn georeference(&self) -> &Georeference {
        &self.georeference
    }

    /// Whether `other` shares this mask's dimensions and georeferencing.
    #[must_use]
    pub fn same_grid(&self, other: &Self) -> bool {
        self.image.dimensions() == other.image.dimensions()
            && self.georeference == other.georeference
    }

    /// A new mask on the same grid with the given raster.
    pub(crate) fn with_image(&self, image: GrayImage) -> Self {
        Self {
            image,
            georeference: self.georeference.clone(),
        }
    }
}

/// The medial ridge of a [`BinaryMask`], on the same grid.
///
/// Every skeleton pixel is a foreground pixel of the source mask.
#[derive(Debug, Clone, PartialEq)]
pub struct SkeletonMask(BinaryMask);

impl SkeletonMask {
    pub(crate) const fn new(mask: BinaryMask) -> Self {
        Self(mask)
    }

    /// The skeleton as a plain mask.
    #[must_use]
    pub const fn as_mask(&self) -> &BinaryMask {
        &self.0
    }

    /// Number of skeleton pixels.
    #[must_use]
    pub fn pixel_count(&self) -> usize {
        self.0.foreground_count()
    }

    /// Returns `true` if there are no skeleton pixels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One labelled water mask in an ordered epoch sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Epoch {
    /// Epoch label, e.g. the acquisition year.
    pub label: String,
    /// Classified water mask for this epoch.
    pub mask: BinaryMask,
}

impl Epoch {
    /// Create a new epoch.
    #[must_use]
    pub fn new(label: impl Into<String>, mask: BinaryMask) -> Self {
        Self {
            label: label.into(),
            mask,
        }
    }
}

/// The vectorized centerline of one epoch.
///
/// Braided or fragmented channels produce several polylines; the set is
/// treated as a single centerline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Centerline {
    /// Source epoch label.
    pub label: String,
    /// Elapsed time since the previous epoch (`None` for the first).
    pub interval_from_previous: Option<f64>,
    /// One polyline per retained skeleton component.
    pub polylines: Vec<Polyline>,
}

impl Centerline {
    /// A centerline with no interval metadata.
    #[must_use]
    pub fn new(label: impl Into<String>, polylines: Vec<Polyline>) -> Self {
        Self {
            label: label.into(),
            interval_from_previous: None,
            polylines,
        }
    }

    /// Returns `true` if the centerline has no points at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.polylines.iter().all(Polyline::is_empty)
    }

    /// Total number of vertices across all polylines.
    #[must_use]
    pub fn point_count(&self) -> usize {
        self.polylines.iter().map(Polyline::len).sum()
    }

    /// All vertices in polyline order, concatenated.
    #[must_use]
    pub fn flatten(&self) -> Vec<Point> {
        flatten(&self.polylines)
    }

    /// Convert to a `geo` multi-line-string for export.
    #[must_use]
    pub fn to_multi_line_string(&self) -> geo::MultiLineString<f64> {
        geo::MultiLineString::new(
            self.polylines
                .iter()
                .map(|pl| {
                    pl.points()
                        .iter()
                        .map(|p| geo::Coord { x: p.x, y: p.y })
                        .collect::<geo::LineString<f64>>()
                })
                .collect(),
        )
    }
}

/// Flatten a polyline set into one ordered point list.
///
/// Polylines are concatenated in order; there is exactly one level of
/// nesting to remove.
#[must_use]
pub fn flatten(polylines: &[Polyline]) -> Vec<Point> {
    let total: usize = polylines.iter().map(Polyline::len).sum();
    let mut points = Vec::with_capacity(total);
    for polyline in polylines {
        points.extend_from_slice(polyline.points());
    }
    points
}

/// Average lateral migration between two consecutive epochs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationEstimate {
    /// Label of the earlier epoch.
    pub epoch_from: String,
    /// Label of the later epoch.
    pub epoch_to: String,
    /// Elapsed time between the epochs.
    pub time_interval: f64,
    /// Mean nearest-point offset divided by `time_interval`.
    pub rate: f64,
    /// Mean nearest-point offset in CRS units.
    pub mean_offset: f64,
    /// Number of earlier-epoch points that were averaged.
    pub matched_points: usize,
    /// Set when either epoch had no centerline; `rate` is then 0.
    pub degenerate: bool,
}

/// Configuration for the centerline pipeline.
///
/// All parameters have defaults matching the reference analysis
/// (30 m Landsat pixels, 10 m simplification tolerance).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Radius in pixels of the disk used for the opening's erosion.
    pub erode_radius: u32,

    /// Radius in pixels of the disk used for the opening's dilation.
    pub dilate_radius: u32,

    /// Side length in pixels of the square ridge-detection window.
    /// Even sizes are widened by one so the window stays centered.
    pub local_max_window: u32,

    /// Douglas-Peucker tolerance in CRS units.
    pub simplify_tolerance: f64,

    /// Skeleton components with fewer pixels are dropped as noise.
    pub min_component_pixels: usize,

    /// Nearest-neighbor backend for migration matching.
    pub nearest_search: NearestSearchKind,

    /// How multi-polyline centerlines are matched.
    pub matching: MatchingMode,
}

impl PipelineConfig {
    /// Default opening erosion radius.
    pub const DEFAULT_ERODE_RADIUS: u32 = 2;
    /// Default opening dilation radius.
    pub const DEFAULT_DILATE_RADIUS: u32 = 2;
    /// Default ridge window side.
    pub const DEFAULT_LOCAL_MAX_WINDOW: u32 = 5;
    /// Default simplification tolerance.
    pub const DEFAULT_SIMPLIFY_TOLERANCE: f64 = 10.0;
    /// Default minimum component size.
    pub const DEFAULT_MIN_COMPONENT_PIXELS: usize = 3;

    /// Check the configuration for values the pipeline cannot honor.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] for a negative or
    /// non-finite tolerance, a zero window, or a zero minimum component
    /// size.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !self.simplify_tolerance.is_finite() || self.simplify_tolerance < 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "simplify_tolerance must be finite and >= 0, got {}",
                self.simplify_tolerance
            )));
        }
        if self.local_max_window == 0 {
            return Err(PipelineError::InvalidConfig(
                "local_max_window must be at least 1".to_string(),
            ));
        }
        if self.min_component_pixels == 0 {
            return Err(PipelineError::InvalidConfig(
                "min_component_pixels must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            erode_radius: Self::DEFAULT_ERODE_RADIUS,
            dilate_radius: Self::DEFAULT_DILATE_RADIUS,
            local_max_window: Self::DEFAULT_LOCAL_MAX_WINDOW,
            simplify_tolerance: Self::DEFAULT_SIMPLIFY_TOLERANCE,
            min_component_pixels: Self::DEFAULT_MIN_COMPONENT_PIXELS,
            nearest_search: NearestSearchKind::default(),
            matching: MatchingMode::default(),
        }
    }
}

/// Errors that can occur during centerline extraction or migration
/// estimation.
///
/// An epoch without a centerline is not an error: it yields a
/// degenerate [`MigrationEstimate`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PipelineError {
    /// A centerline geometry was not line-like.
    #[error("expected a LineString or MultiLineString, got {kind}")]
    InvalidGeometryKind {
        /// Name of the rejected geometry kind.
        kind: &'static str,
    },

    /// The time interval was zero, negative or not finite.
    #[error("time interval must be positive and finite, got {0}")]
    NonPositiveInterval(f64),

    /// An epoch mask does not share the run's grid.
    #[error("mask for epoch {label} does not match the grid of the first epoch")]
    MismatchedGrid {
        /// Label of the offending epoch.
        label: String,
    },

    /// Raw mask data was malformed.
    #[error("invalid mask: {0}")]
    InvalidMask(String),

    /// Pipeline configuration is invalid.
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),
}

/// A failed estimate, naming the epoch pair it belongs to.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("migration {epoch_from} -> {epoch_to} failed: {source}")]
pub struct PairError {
    /// Label of the earlier epoch.
    pub epoch_from: String,
    /// Label of the later epoch.
    pub epoch_to: String,
    /// Why the pair failed.
    pub source: PipelineError,
}
