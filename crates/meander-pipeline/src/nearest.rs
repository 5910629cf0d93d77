//! Nearest-neighbor distance queries between point sets.
//!
//! This module defines the [`NearestSearch`] trait for pluggable search
//! backends and the [`NearestSearchKind`] enum for selecting one at
//! runtime. Both backends return exactly the same distances; they differ
//! only in cost.

use rstar::RTree;
use serde::{Deserialize, Serialize};

use crate::types::Point;

/// Selects which nearest-neighbor backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NearestSearchKind {
    /// Compare every query point with every target point.
    ///
    /// O(|queries| * |targets|). Fine for simplified centerlines (tens to
    /// low hundreds of vertices per epoch) but does not scale to dense
    /// point clouds.
    Exhaustive,

    /// Bulk-load the targets into an R*-tree and query it per point.
    ///
    /// O((|queries| + |targets|) log |targets|) on typical inputs.
    #[default]
    RTree,
}

/// Trait for nearest-neighbor search strategies.
pub trait NearestSearch {
    /// For every point in `queries`, the Euclidean distance to the closest
    /// point in `targets`.
    ///
    /// Returns infinity for every query when `targets` is empty.
    fn nearest_distances(&self, queries: &[Point], targets: &[Point]) -> Vec<f64>;
}

impl NearestSearch for NearestSearchKind {
    fn nearest_distances(&self, queries: &[Point], targets: &[Point]) -> Vec<f64> {
        if targets.is_empty() {
            return vec![f64::INFINITY; queries.len()];
        }
        match *self {
            Self::Exhaustive => exhaustive(queries, targets),
            Self::RTree => rtree(queries, targets),
        }
    }
}

fn exhaustive(queries: &[Point], targets: &[Point]) -> Vec<f64> {
    queries
        .iter()
        .map(|&q| {
            targets
                .iter()
                .map(|&t| q.distance_squared(t))
                .fold(f64::INFINITY, f64::min)
                .sqrt()
        })
        .collect()
}

fn rtree(queries: &[Point], targets: &[Point]) -> Vec<f64> {
    let tree = RTree::bulk_load(targets.iter().map(|p| [p.x, p.y]).collect());
    queries
        .iter()
        .map(|&q| {
            tree.nearest_neighbor_iter(&[q.x, q.y])
                .next()
                .map_or(f64::INFINITY, |&[x, y]| q.distance(Point::new(x, y)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(n: u32, step: f64, offset: f64) -> Vec<Point> {
        (0..n)
            .flat_map(|i| {
                (0..n).map(move |j| {
                    Point::new(
                        f64::from(i).mul_add(step, offset),
                        f64::from(j).mul_add(step, offset * 0.5),
                    )
                })
            })
            .collect()
    }

    #[test]
    fn default_is_rtree() {
        assert_eq!(NearestSearchKind::default(), NearestSearchKind::RTree);
    }

    #[test]
    fn empty_targets_give_infinity() {
        let queries = [Point::new(0.0, 0.0), Point::new(1.0, 1.0)];
        for kind in [NearestSearchKind::Exhaustive, NearestSearchKind::RTree] {
            let d = kind.nearest_distances(&queries, &[]);
            assert_eq!(d.len(), 2);
            assert!(d.iter().all(|v| v.is_infinite()));
        }
    }

    #[test]
    fn empty_queries_give_nothing() {
        let targets = [Point::new(0.0, 0.0)];
        assert!(
            NearestSearchKind::RTree
                .nearest_distances(&[], &targets)
                .is_empty()
        );
    }

    #[test]
    fn exhaustive_finds_closest() {
        let targets = [Point::new(0.0, 5.0), Point::new(10.0, 5.0)];
        let queries = [Point::new(0.0, 0.0), Point::new(9.0, 1.0)];
        let d = NearestSearchKind::Exhaustive.nearest_distances(&queries, &targets);
        assert!((d[0] - 5.0).abs() < 1e-12);
        assert!((d[1] - 17.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn backends_agree() {
        let queries = grid(12, 3.7, 0.3);
        let targets = grid(9, 5.1, 1.9);
        let a = NearestSearchKind::Exhaustive.nearest_distances(&queries, &targets);
        let b = NearestSearchKind::RTree.nearest_distances(&queries, &targets);
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-12, "{x} != {y}");
        }
    }
}
