//! Epoch orchestration: per-epoch centerline extraction followed by
//! pairwise migration estimation.
//!
//! Extraction has no cross-epoch dependencies and runs one task per
//! epoch. Estimation only reads pairs of finished centerlines and runs
//! one task per consecutive pair. Both phases preserve input order.

use tracing::{debug, info, warn};
use web_time::Instant;

use crate::diagnostics::{EpochDiagnostics, SeriesDiagnostics};
#[allow(clippy::wildcard_imports)]
use crate::maybe_rayon::*;
use crate::metrics::{BaselineComparison, MigrationVector, compare_to_baseline, migration_vector};
use crate::migration::{MigrationEstimator, check_interval};
use crate::skeleton::skeletonize_staged;
use crate::types::{Centerline, Epoch, MigrationEstimate, PipelineConfig, PipelineError, Polyline};
use crate::vectorize::vectorize_with_stats;

/// Everything produced by [`EpochPipeline::run_detailed`].
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesResult {
    /// One centerline per epoch, in input order.
    pub centerlines: Vec<Centerline>,
    /// One estimate per consecutive epoch pair, in input order.
    pub estimates: Vec<MigrationEstimate>,
    /// Every epoch after the first compared with the first.
    pub baseline: Vec<BaselineComparison>,
    /// Centroid shift per consecutive pair; `None` when either epoch has
    /// no centerline.
    pub vectors: Vec<Option<MigrationVector>>,
    /// Timing and counts.
    pub diagnostics: SeriesDiagnostics,
}

/// Runs the skeletonize, vectorize and estimate stages over an ordered
/// epoch sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochPipeline {
    config: PipelineConfig,
}

impl EpochPipeline {
    /// Create a pipeline with a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if
    /// [`PipelineConfig::validate`] rejects `config`.
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The validated configuration this pipeline runs with.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The estimator configured by [`PipelineConfig::nearest_search`] and
    /// [`PipelineConfig::matching`].
    #[must_use]
    pub const fn estimator(&self) -> MigrationEstimator {
        MigrationEstimator::new(self.config.nearest_search, self.config.matching)
    }

    /// Skeletonize and vectorize a single epoch.
    #[must_use = "returns the extracted centerline"]
    pub fn extract_centerline(&self, epoch: &Epoch) -> Centerline {
        self.extract(epoch).0
    }

    /// Run the full series and return only the migration estimates.
    ///
    /// The result has `epochs.len() - 1` entries (none for fewer than two
    /// epochs).
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NonPositiveInterval`] for an invalid
    /// `time_interval` and [`PipelineError::MismatchedGrid`] if the masks
    /// do not share one grid. Both are checked before any raster work.
    pub fn run(
        &self,
        epochs: Vec<Epoch>,
        time_interval: f64,
    ) -> Result<Vec<MigrationEstimate>, PipelineError> {
        self.run_detailed(epochs, time_interval)
            .map(|result| result.estimates)
    }

    /// Run the full series, keeping centerlines, comparison metrics and
    /// diagnostics.
    ///
    /// # Errors
    ///
    /// Same as [`run`](Self::run).
    pub fn run_detailed(
        &self,
        epochs: Vec<Epoch>,
        time_interval: f64,
    ) -> Result<SeriesResult, PipelineError> {
        let start = Instant::now();

        check_interval(time_interval)?;
        if let Some(first) = epochs.first() {
            if let Some(bad) = epochs.iter().find(|e| !e.mask.same_grid(&first.mask)) {
                return Err(PipelineError::MismatchedGrid {
                    label: bad.label.clone(),
                });
            }
            if first.mask.georeference().looks_geographic() {
                warn!(
                    crs = first.mask.georeference().crs.as_deref().unwrap_or_default(),
                    "masks use a geographic CRS; rates will be in degrees per time unit"
                );
            }
        }

        info!(epochs = epochs.len(), time_interval, "extracting centerlines");

        let extracted: Vec<(Centerline, EpochDiagnostics)> = epochs
            .into_par_iter()
            .map(|epoch| self.extract(&epoch))
            .collect();
        let (mut centerlines, epoch_diagnostics): (Vec<_>, Vec<_>) =
            extracted.into_iter().unzip();
        for centerline in centerlines.iter_mut().skip(1) {
            centerline.interval_from_previous = Some(time_interval);
        }

        let estimation_start = Instant::now();
        let estimator = self.estimator();
        let pairs = centerlines.len().saturating_sub(1);
        let estimates = (0..pairs)
            .into_par_iter()
            .map(|i| estimator.estimate(&centerlines[i], &centerlines[i + 1], time_interval))
            .collect::<Result<Vec<_>, _>>()?;
        let vectors = (0..pairs)
            .map(|i| migration_vector(&centerlines[i], &centerlines[i + 1]))
            .collect();
        let baseline = centerlines.first().map_or_else(Vec::new, |first| {
            centerlines
                .iter()
                .skip(1)
                .map(|later| compare_to_baseline(self.config.nearest_search, first, later))
                .collect()
        });
        let estimation = estimation_start.elapsed();

        let degenerate_pairs = estimates.iter().filter(|e| e.degenerate).count();
        info!(estimates = estimates.len(), degenerate_pairs, "migration series complete");

        Ok(SeriesResult {
            centerlines,
            estimates,
            baseline,
            vectors,
            diagnostics: SeriesDiagnostics {
                epochs: epoch_diagnostics,
                degenerate_pairs,
                estimation,
                total_duration: start.elapsed(),
            },
        })
    }

    fn extract(&self, epoch: &Epoch) -> (Centerline, EpochDiagnostics) {
        let config = &self.config;

        let t0 = Instant::now();
        let staged = skeletonize_staged(
            &epoch.mask,
            config.erode_radius,
            config.dilate_radius,
            config.local_max_window,
        );
        let skeletonize = t0.elapsed();

        let t1 = Instant::now();
        let vectorized = vectorize_with_stats(
            &staged.skeleton,
            config.simplify_tolerance,
            config.min_component_pixels,
        );
        let vectorize = t1.elapsed();

        let diagnostics = EpochDiagnostics {
            label: epoch.label.clone(),
            width: epoch.mask.width(),
            height: epoch.mask.height(),
            mask_pixels: epoch.mask.foreground_count(),
            opened_pixels: staged.opened.foreground_count(),
            skeleton_pixels: staged.skeleton.pixel_count(),
            kept_components: vectorized.kept_components,
            dropped_components: vectorized.dropped_components,
            raw_vertices: vectorized.raw_vertices,
            simplified_vertices: vectorized.polylines.iter().map(Polyline::len).sum(),
            skeletonize,
            vectorize,
        };
        debug!(
            epoch = %epoch.label,
            mask_pixels = diagnostics.mask_pixels,
            skeleton_pixels = diagnostics.skeleton_pixels,
            polylines = vectorized.polylines.len(),
            vertices = diagnostics.simplified_vertices,
            "extracted centerline"
        );

        (
            Centerline::new(epoch.label.clone(), vectorized.polylines),
            diagnostics,
        )
    }
}
