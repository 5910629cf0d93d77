//! meander-pipeline: River centerline extraction and migration estimation
//! (sans-IO).
//!
//! Turns a time series of binary water masks into a series of lateral
//! migration rates through:
//! opening -> distance transform -> ridge detection -> component tracing
//! -> simplification -> nearest-point matching between consecutive epochs.
//!
//! This crate has **no I/O dependencies**: it operates on in-memory masks
//! and returns structured data. Reading rasters and writing results lives
//! in `meander-bench` or in the caller.

pub mod diagnostics;
pub mod distance;
mod maybe_rayon;
pub mod metrics;
pub mod migration;
pub mod morphology;
pub mod nearest;
pub mod pipeline;
pub mod simplify;
pub mod skeleton;
pub mod types;
pub mod vectorize;

pub use diagnostics::{EpochDiagnostics, SeriesDiagnostics};
pub use metrics::{BaselineComparison, MigrationVector};
pub use migration::{
    MatchingMode, MigrationEstimator, estimate, estimate_geometry_series, polylines_from_geometry,
};
pub use nearest::{NearestSearch, NearestSearchKind};
pub use pipeline::{EpochPipeline, SeriesResult};
pub use skeleton::{StagedSkeleton, skeletonize, skeletonize_staged};
pub use types::{
    BinaryMask, Centerline, Epoch, GeoTransform, Georeference, GrayImage, MigrationEstimate,
    PairError, PipelineConfig, PipelineError, Point, Polyline, SkeletonMask,
};
pub use vectorize::{Vectorized, vectorize, vectorize_with_stats};

/// Run the full migration analysis over an ordered epoch sequence.
///
/// Every epoch is skeletonized and vectorized independently, then each
/// consecutive pair is matched to produce one [`MigrationEstimate`]. The
/// output has one entry fewer than `epochs`, in epoch order.
///
/// # Pipeline steps
///
/// 1. Morphological opening (erode, then dilate)
/// 2. Euclidean distance transform of the opened mask
/// 3. Square-window maximum; ridge pixels form the skeleton
/// 4. 8-connected component tracing, one path per branch
/// 5. Path simplification (Ramer-Douglas-Peucker)
/// 6. Nearest-point matching of each consecutive pair
///
/// An epoch whose mask yields no centerline produces degenerate
/// estimates (rate 0, flagged) rather than an error.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if `config` is invalid,
/// [`PipelineError::NonPositiveInterval`] if `time_interval` is not a
/// positive finite number, and [`PipelineError::MismatchedGrid`] if the
/// masks do not share one grid.
pub fn run(
    epochs: Vec<Epoch>,
    time_interval: f64,
    config: &PipelineConfig,
) -> Result<Vec<MigrationEstimate>, PipelineError> {
    EpochPipeline::new(config.clone())?.run(epochs, time_interval)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn diagonal_channel(label: &str, offset: u32) -> Epoch {
        // A channel running corner to corner, about 7 pixels across.
        let mask = BinaryMask::from_fn(60, 60, Georeference::default(), |x, y| {
            let d = i64::from(x) - i64::from(y) - i64::from(offset);
            (-5..=5).contains(&d) && (4..56).contains(&x)
        });
        Epoch::new(label, mask)
    }

    #[test]
    fn run_with_default_config() {
        let epochs = vec![diagonal_channel("a", 0), diagonal_channel("b", 0)];
        let estimates = run(epochs, 1.0, &PipelineConfig::default()).unwrap();
        assert_eq!(estimates.len(), 1);
        assert!(!estimates[0].degenerate);
        assert!(estimates[0].rate.abs() < f64::EPSILON);
    }

    #[test]
    fn run_rejects_invalid_config() {
        let config = PipelineConfig {
            simplify_tolerance: f64::NAN,
            ..PipelineConfig::default()
        };
        let result = run(vec![diagonal_channel("a", 0)], 1.0, &config);
        assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn run_with_empty_mask_is_degenerate() {
        let empty = Epoch::new("b", BinaryMask::empty(60, 60, Georeference::default()));
        let estimates = run(
            vec![diagonal_channel("a", 0), empty],
            5.0,
            &PipelineConfig::default(),
        )
        .unwrap();
        assert_eq!(estimates.len(), 1);
        assert!(estimates[0].degenerate);
        assert!(estimates[0].rate.abs() < f64::EPSILON);
    }
}
