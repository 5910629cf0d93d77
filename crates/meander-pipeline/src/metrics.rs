//! Comparison metrics between centerlines.
//!
//! Complements the migration rate with measures used when comparing a
//! centerline to a reference epoch: symmetric Hausdorff distance,
//! index-paired RMSE, and the centroid shift between epochs.

use serde::{Deserialize, Serialize};

use crate::nearest::{NearestSearch, NearestSearchKind};
use crate::types::{Centerline, Point};

/// A centerline compared with the first (baseline) epoch of a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineComparison {
    /// Label of the baseline epoch.
    pub baseline: String,
    /// Label of the compared epoch.
    pub epoch: String,
    /// Index-paired RMSE, see [`index_rmse`].
    pub rmse: f64,
    /// Symmetric Hausdorff distance, see [`hausdorff_distance`].
    pub hausdorff: f64,
}

/// Displacement of the centerline centroid between two epochs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationVector {
    /// Label of the earlier epoch.
    pub epoch_from: String,
    /// Label of the later epoch.
    pub epoch_to: String,
    /// Centroid of the earlier centerline's vertices.
    pub from: Point,
    /// Centroid of the later centerline's vertices.
    pub to: Point,
    /// Distance between the two centroids.
    pub distance: f64,
}

/// Largest nearest-point distance from `a` to `b`.
///
/// 0 when `a` is empty; infinite when only `b` is empty.
#[must_use]
pub fn directed_hausdorff(search: NearestSearchKind, a: &[Point], b: &[Point]) -> f64 {
    search
        .nearest_distances(a, b)
        .into_iter()
        .fold(0.0, f64::max)
}

/// Symmetric Hausdorff distance between two vertex sets.
///
/// 0 when both are empty, infinite when exactly one is.
#[must_use]
pub fn hausdorff_distance(search: NearestSearchKind, a: &[Point], b: &[Point]) -> f64 {
    directed_hausdorff(search, a, b).max(directed_hausdorff(search, b, a))
}

/// Root-mean-square distance between `predicted[i]` and `observed[i]`
/// over the shorter of the two lists.
///
/// Index pairing assumes both lists are sampled in corresponding order;
/// it is a rough agreement score, not a correspondence-aware metric.
/// Returns 0 if either list is empty.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn index_rmse(predicted: &[Point], observed: &[Point]) -> f64 {
    let n = predicted.len().min(observed.len());
    if n == 0 {
        return 0.0;
    }
    let sum: f64 = predicted
        .iter()
        .zip(observed)
        .map(|(p, o)| p.distance_squared(*o))
        .sum();
    (sum / n as f64).sqrt()
}

/// Arithmetic mean of the points, or `None` for an empty slice.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn centroid(points: &[Point]) -> Option<Point> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    Some(Point::new(sx / n, sy / n))
}

/// Compare `epoch` with `baseline`.
#[must_use]
pub fn compare_to_baseline(
    search: NearestSearchKind,
    baseline: &Centerline,
    epoch: &Centerline,
) -> BaselineComparison {
    let observed = baseline.flatten();
    let predicted = epoch.flatten();
    BaselineComparison {
        baseline: baseline.label.clone(),
        epoch: epoch.label.clone(),
        rmse: index_rmse(&predicted, &observed),
        hausdorff: hausdorff_distance(search, &predicted, &observed),
    }
}

/// Centroid shift from `earlier` to `later`, or `None` if either is empty.
#[must_use]
pub fn migration_vector(earlier: &Centerline, later: &Centerline) -> Option<MigrationVector> {
    let from = centroid(&earlier.flatten())?;
    let to = centroid(&later.flatten())?;
    Some(MigrationVector {
        epoch_from: earlier.label.clone(),
        epoch_to: later.label.clone(),
        from,
        to,
        distance: from.distance(to),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::Polyline;

    fn pts(coords: &[(f64, f64)]) -> Vec<Point> {
        coords.iter().map(|&(x, y)| Point::new(x, y)).collect()
    }

    #[test]
    fn hausdorff_is_symmetric_max() {
        let a = pts(&[(0.0, 0.0)]);
        let b = pts(&[(0.0, 0.0), (10.0, 0.0)]);
        let kind = NearestSearchKind::RTree;
        assert!(directed_hausdorff(kind, &a, &b).abs() < f64::EPSILON);
        assert!((directed_hausdorff(kind, &b, &a) - 10.0).abs() < 1e-12);
        assert!((hausdorff_distance(kind, &a, &b) - 10.0).abs() < 1e-12);
        assert!((hausdorff_distance(kind, &b, &a) - 10.0).abs() < 1e-12);
    }

    #[test]
    fn hausdorff_empty_cases() {
        let kind = NearestSearchKind::Exhaustive;
        let a = pts(&[(1.0, 1.0)]);
        assert!(hausdorff_distance(kind, &[], &[]).abs() < f64::EPSILON);
        assert!(hausdorff_distance(kind, &a, &[]).is_infinite());
        assert!(hausdorff_distance(kind, &[], &a).is_infinite());
    }

    #[test]
    fn rmse_over_shorter_list() {
        let predicted = pts(&[(0.0, 3.0), (1.0, 4.0), (99.0, 99.0)]);
        let observed = pts(&[(0.0, 0.0), (1.0, 0.0)]);
        // Squared errors 9 and 16 over two pairs.
        let expected = (25.0_f64 / 2.0).sqrt();
        assert!((index_rmse(&predicted, &observed) - expected).abs() < 1e-12);
        assert!(index_rmse(&[], &observed).abs() < f64::EPSILON);
    }

    #[test]
    fn centroid_of_square() {
        let c = centroid(&pts(&[(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0)])).unwrap();
        assert_eq!(c, Point::new(1.0, 1.0));
        assert!(centroid(&[]).is_none());
    }

    #[test]
    fn migration_vector_between_epochs() {
        let a = Centerline::new("a", vec![Polyline::new(pts(&[(0.0, 0.0), (10.0, 0.0)]))]);
        let b = Centerline::new("b", vec![Polyline::new(pts(&[(0.0, 4.0), (10.0, 4.0)]))]);
        let v = migration_vector(&a, &b).unwrap();
        assert_eq!(v.from, Point::new(5.0, 0.0));
        assert_eq!(v.to, Point::new(5.0, 4.0));
        assert!((v.distance - 4.0).abs() < 1e-12);
        assert!(migration_vector(&a, &Centerline::new("c", vec![])).is_none());
    }

    #[test]
    fn baseline_comparison_of_identical_centerlines() {
        let a = Centerline::new("a", vec![Polyline::new(pts(&[(0.0, 0.0), (3.0, 4.0)]))]);
        let cmp = compare_to_baseline(NearestSearchKind::RTree, &a, &a);
        assert_eq!(cmp.baseline, "a");
        assert!(cmp.rmse.abs() < f64::EPSILON);
        assert!(cmp.hausdorff.abs() < f64::EPSILON);
    }
}
