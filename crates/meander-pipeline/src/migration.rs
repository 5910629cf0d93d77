//! Centerline migration: average lateral displacement between epochs.
//!
//! Uses one-directional nearest-point matching. Every vertex of the
//! earlier centerline is matched to its closest vertex of the later
//! centerline; the mean of those distances, divided by the elapsed time,
//! is the migration rate.
//!
//! This is *not* a symmetric curve distance. Swapping the epochs generally
//! changes the result, and the value depends on vertex density and
//! sampling. It is not a measurement along bank normals either. Distances
//! are planar Euclidean in the CRS of the polylines, so geographic
//! (degree) coordinates must be projected by the caller first.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::nearest::{NearestSearch, NearestSearchKind};
use crate::types::{
    Centerline, MigrationEstimate, PairError, PipelineError, Point, Polyline, flatten,
};

/// How centerlines made of several polylines are matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MatchingMode {
    /// Flatten each centerline into one point cloud and match globally.
    #[default]
    Flattened,

    /// Match each earlier polyline against the single later polyline with
    /// the smallest mean offset, then weight by vertex count.
    ///
    /// Keeps a braid from borrowing vertices of a neighboring channel.
    PerComponent,
}

/// Estimates migration rates between pairs of centerlines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationEstimator {
    /// Nearest-neighbor backend.
    pub search: NearestSearchKind,
    /// Multi-polyline matching policy.
    pub matching: MatchingMode,
}

impl MigrationEstimator {
    /// Create an estimator.
    #[must_use]
    pub const fn new(search: NearestSearchKind, matching: MatchingMode) -> Self {
        Self { search, matching }
    }

    /// Estimate the migration rate from `earlier` to `later`.
    ///
    /// If either centerline is empty the estimate is flagged degenerate
    /// with a rate of 0; this is a valid observation, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NonPositiveInterval`] if `time_interval`
    /// is zero, negative or not finite.
    pub fn estimate(
        &self,
        earlier: &Centerline,
        later: &Centerline,
        time_interval: f64,
    ) -> Result<MigrationEstimate, PipelineError> {
        let offset = self.mean_offset(&earlier.polylines, &later.polylines, time_interval)?;
        let estimate = match offset {
            Some((mean_offset, matched_points)) => MigrationEstimate {
                epoch_from: earlier.label.clone(),
                epoch_to: later.label.clone(),
                time_interval,
                rate: mean_offset / time_interval,
                mean_offset,
                matched_points,
                degenerate: false,
            },
            None => {
                warn!(
                    from = %earlier.label,
                    to = %later.label,
                    "empty centerline, recording degenerate estimate"
                );
                MigrationEstimate {
                    epoch_from: earlier.label.clone(),
                    epoch_to: later.label.clone(),
                    time_interval,
                    rate: 0.0,
                    mean_offset: 0.0,
                    matched_points: 0,
                    degenerate: true,
                }
            }
        };
        Ok(estimate)
    }

    /// Mean nearest-point offset of `earlier` against `later` and the
    /// number of averaged points, or `None` when either set is empty.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NonPositiveInterval`] for an invalid
    /// interval, checked before anything else.
    pub fn mean_offset(
        &self,
        earlier: &[Polyline],
        later: &[Polyline],
        time_interval: f64,
    ) -> Result<Option<(f64, usize)>, PipelineError> {
        check_interval(time_interval)?;

        let earlier_points = flatten(earlier);
        let later_points = flatten(later);
        if earlier_points.is_empty() || later_points.is_empty() {
            return Ok(None);
        }

        let result = match self.matching {
            MatchingMode::Flattened => {
                let sum = self.sum_nearest(&earlier_points, &later_points);
                (sum / count_as_f64(earlier_points.len()), earlier_points.len())
            }
            MatchingMode::PerComponent => self.per_component(earlier, later),
        };
        Ok(Some(result))
    }

    fn sum_nearest(&self, queries: &[Point], targets: &[Point]) -> f64 {
        self.search
            .nearest_distances(queries, targets)
            .into_iter()
            .sum()
    }

    fn per_component(&self, earlier: &[Polyline], later: &[Polyline]) -> (f64, usize) {
        let mut total = 0.0;
        let mut count = 0;
        for component in earlier.iter().filter(|pl| !pl.is_empty()) {
            let best = later
                .iter()
                .filter(|pl| !pl.is_empty())
                .map(|target| self.sum_nearest(component.points(), target.points()))
                .fold(f64::INFINITY, f64::min);
            total += best;
            count += component.len();
        }
        (total / count_as_f64(count), count)
    }
}

/// Estimate the migration rate from `earlier` to `later` with the default
/// estimator (flattened matching, R*-tree search).
///
/// # Errors
///
/// Returns [`PipelineError::NonPositiveInterval`] if `time_interval` is
/// zero, negative or not finite.
pub fn estimate(
    earlier: &Centerline,
    later: &Centerline,
    time_interval: f64,
) -> Result<MigrationEstimate, PipelineError> {
    MigrationEstimator::default().estimate(earlier, later, time_interval)
}

/// Reject zero, negative and non-finite intervals.
///
/// # Errors
///
/// Returns [`PipelineError::NonPositiveInterval`] carrying the value.
pub fn check_interval(time_interval: f64) -> Result<(), PipelineError> {
    if time_interval.is_finite() && time_interval > 0.0 {
        Ok(())
    } else {
        Err(PipelineError::NonPositiveInterval(time_interval))
    }
}

/// Extract polylines from a centerline geometry handed over by an
/// external collaborator.
///
/// Accepts `Line`, `LineString` and `MultiLineString`. Anything else is a
/// contract violation: treating a polygon or point as "no centerline"
/// would report an upstream classification fault as zero migration.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidGeometryKind`] for non-linear
/// geometries.
pub fn polylines_from_geometry(
    geometry: &geo::Geometry<f64>,
) -> Result<Vec<Polyline>, PipelineError> {
    let to_polyline = |line: &geo::LineString<f64>| {
        Polyline::new(line.coords().map(|c| Point::new(c.x, c.y)).collect())
    };
    match geometry {
        geo::Geometry::Line(line) => Ok(vec![Polyline::new(vec![
            Point::new(line.start.x, line.start.y),
            Point::new(line.end.x, line.end.y),
        ])]),
        geo::Geometry::LineString(line) => Ok(vec![to_polyline(line)]),
        geo::Geometry::MultiLineString(lines) => Ok(lines.iter().map(to_polyline).collect()),
        other => Err(PipelineError::InvalidGeometryKind {
            kind: geometry_kind(other),
        }),
    }
}

/// Estimate a migration series from labelled geometries, one estimate per
/// consecutive pair.
///
/// A malformed pair does not stop the series: its slot holds a
/// [`PairError`] naming both epochs.
#[must_use = "returns one result per consecutive pair"]
pub fn estimate_geometry_series(
    estimator: &MigrationEstimator,
    epochs: &[(String, geo::Geometry<f64>)],
    time_interval: f64,
) -> Vec<Result<MigrationEstimate, PairError>> {
    epochs
        .windows(2)
        .map(|pair| {
            let (from, from_geometry) = &pair[0];
            let (to, to_geometry) = &pair[1];
            let attempt = || -> Result<MigrationEstimate, PipelineError> {
                let earlier =
                    Centerline::new(from.clone(), polylines_from_geometry(from_geometry)?);
                let later = Centerline::new(to.clone(), polylines_from_geometry(to_geometry)?);
                estimator.estimate(&earlier, &later, time_interval)
            };
            attempt().map_err(|source| PairError {
                epoch_from: from.clone(),
                epoch_to: to.clone(),
                source,
            })
        })
        .collect()
}

fn geometry_kind(geometry: &geo::Geometry<f64>) -> &'static str {
    match geometry {
        geo::Geometry::Point(_) => "Point",
        geo::Geometry::Line(_) => "Line",
        geo::Geometry::LineString(_) => "LineString",
        geo::Geometry::Polygon(_) => "Polygon",
        geo::Geometry::MultiPoint(_) => "MultiPoint",
        geo::Geometry::MultiLineString(_) => "MultiLineString",
        geo::Geometry::MultiPolygon(_) => "MultiPolygon",
        geo::Geometry::GeometryCollection(_) => "GeometryCollection",
        geo::Geometry::Rect(_) => "Rect",
        geo::Geometry::Triangle(_) => "Triangle",
    }
}

#[allow(clippy::cast_precision_loss)]
fn count_as_f64(n: usize) -> f64 {
    n as f64
}
