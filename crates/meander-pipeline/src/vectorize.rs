//! Skeleton vectorization: turn ridge pixels into simplified polylines.
//!
//! 1. **Label:** group skeleton pixels into 8-connected components with a
//!    union-find.
//! 2. **Filter:** drop components smaller than the minimum pixel count.
//! 3. **Order:** build a pixel adjacency graph per component (orthogonal
//!    steps cost 1, diagonal steps cost sqrt 2) and follow its dominant
//!    path: the longest shortest path found by a double Dijkstra sweep.
//! 4. **Peel:** remove the path and its 8-neighbors, relabel what is left
//!    and repeat step 3 on every remaining branch that still meets the
//!    minimum pixel count. Braid arms and the far side of a loop become
//!    their own polylines. Short spurs and the extra pixels of
//!    multi-pixel-wide ridges are absorbed.
//! 5. **Emit:** map each path pixel to its center in the mask's CRS.
//! 6. **Simplify:** Ramer-Douglas-Peucker with the given tolerance.

use std::collections::{HashMap, VecDeque};

use petgraph::algo::{astar, dijkstra};
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;

use crate::simplify::simplify_paths;
use crate::types::{BinaryMask, PipelineConfig, Polyline, SkeletonMask};

/// Forward half of the 8-neighborhood (E, SW, S, SE). Visiting only these
/// from every pixel touches each adjacent pair exactly once.
const FORWARD_NEIGHBORS: [(i64, i64); 4] = [(1, 0), (-1, 1), (0, 1), (1, 1)];

const ALL_NEIGHBORS: [(i64, i64); 8] = [
    (-1, -1), (0, -1), (1, -1), (-1, 0), (1, 0), (-1, 1), (0, 1), (1, 1),
];

/// Output of [`vectorize_with_stats`].
#[derive(Debug, Clone, PartialEq)]
pub struct Vectorized {
    /// One simplified polyline per traced branch. A component with a
    /// loop or a braid yields several.
    pub polylines: Vec<Polyline>,
    /// Components that met the minimum pixel count.
    pub kept_components: usize,
    /// Components dropped as noise.
    pub dropped_components: usize,
    /// Vertices before simplification.
    pub raw_vertices: usize,
}

/// Vectorize a skeleton into simplified polylines.
///
/// Components with fewer than
/// [`PipelineConfig::DEFAULT_MIN_COMPONENT_PIXELS`] pixels are dropped.
/// An empty skeleton yields no polylines.
#[must_use = "returns the traced polylines"]
pub fn vectorize(skeleton: &SkeletonMask, simplify_tolerance: f64) -> Vec<Polyline> {
    vectorize_with_stats(
        skeleton,
        simplify_tolerance,
        PipelineConfig::DEFAULT_MIN_COMPONENT_PIXELS,
    )
    .polylines
}

/// Vectorize a skeleton with an explicit minimum component size, also
/// reporting component and vertex counts.
///
/// The same minimum applies to the branches left over after peeling a
/// component's dominant path.
#[must_use = "returns the traced polylines and counts"]
pub fn vectorize_with_stats(
    skeleton: &SkeletonMask,
    simplify_tolerance: f64,
    min_component_pixels: usize,
) -> Vectorized {
    let traced = trace_components(skeleton, min_component_pixels);
    let raw_vertices = traced.polylines.iter().map(Polyline::len).sum();
    Vectorized {
        polylines: simplify_paths(&traced.polylines, simplify_tolerance),
        kept_components: traced.kept,
        dropped_components: traced.dropped,
        raw_vertices,
    }
}

struct Traced {
    polylines: Vec<Polyline>,
    kept: usize,
    dropped: usize,
}

/// Skeleton pixels in row-major order with a reverse lookup.
///
/// Pixel ids are positions in `pixels`, so sorting ids sorts pixels in
/// row-major order.
struct PixelIndex {
    width: u32,
    height: u32,
    pixels: Vec<(u32, u32)>,
    index_of: Vec<Option<usize>>,
}

impl PixelIndex {
    fn new(mask: &BinaryMask) -> Self {
        let (width, height) = (mask.width(), mask.height());
        let mut pixels = Vec::new();
        let mut index_of = vec![None; width as usize * height as usize];
        for y in 0..height {
            for x in 0..width {
                if mask.contains(x, y) {
                    index_of[y as usize * width as usize + x as usize] = Some(pixels.len());
                    pixels.push((x, y));
                }
            }
        }
        Self {
            width,
            height,
            pixels,
            index_of,
        }
    }

    /// The skeleton pixel at offset `(dx, dy)` from pixel `id`, if any.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn neighbor(&self, id: usize, dx: i64, dy: i64) -> Option<usize> {
        let (x, y) = self.pixels[id];
        let (nx, ny) = (i64::from(x) + dx, i64::from(y) + dy);
        if nx < 0 || ny < 0 || nx >= i64::from(self.width) || ny >= i64::from(self.height) {
            return None;
        }
        self.index_of[ny as usize * self.width as usize + nx as usize]
    }
}

/// Position of each pixel id within the branch being processed.
///
/// Entries are set by [`Slots::enter`] and cleared by [`Slots::leave`], so
/// one buffer serves every branch.
struct Slots(Vec<Option<usize>>);

impl Slots {
    fn enter(&mut self, members: &[usize]) {
        for (local, &id) in members.iter().enumerate() {
            self.0[id] = Some(local);
        }
    }

    fn leave(&mut self, members: &[usize]) {
        for &id in members {
            self.0[id] = None;
        }
    }

    fn get(&self, id: usize) -> Option<usize> {
        self.0[id]
    }
}

/// Label components, then peel dominant paths off each one.
///
/// Components are emitted in row-major order of their first pixel. Within
/// a component the dominant path comes first, then the branches left over,
/// breadth first.
fn trace_components(skeleton: &SkeletonMask, min_component_pixels: usize) -> Traced {
    let mask = skeleton.as_mask();
    let index = PixelIndex::new(mask);
    let transform = mask.georeference().transform;
    let mut slots = Slots(vec![None; index.pixels.len()]);

    let all: Vec<usize> = (0..index.pixels.len()).collect();
    let mut polylines = Vec::new();
    let mut kept = 0;
    let mut dropped = 0;

    for component in connected_groups(&index, &all, &mut slots) {
        if component.len() < min_component_pixels {
            dropped += 1;
            continue;
        }
        kept += 1;

        let mut pending = VecDeque::from([component]);
        while let Some(branch) = pending.pop_front() {
            slots.enter(&branch);
            let graph = branch_graph(&index, &branch, &slots);
            let path = dominant_path(&graph);

            let mut taken = vec![false; branch.len()];
            for node in &path {
                let id = branch[node.index()];
                taken[node.index()] = true;
                for (dx, dy) in ALL_NEIGHBORS {
                    if let Some(local) = index.neighbor(id, dx, dy).and_then(|n| slots.get(n)) {
                        taken[local] = true;
                    }
                }
            }
            slots.leave(&branch);

            let points = path
                .iter()
                .map(|node| {
                    let (x, y) = index.pixels[branch[node.index()]];
                    transform.pixel_center(x, y)
                })
                .collect();
            polylines.push(Polyline::new(points));

            let rest: Vec<usize> = branch
                .iter()
                .zip(&taken)
                .filter(|&(_, &used)| !used)
                .map(|(&id, _)| id)
                .collect();
            pending.extend(
                connected_groups(&index, &rest, &mut slots)
                    .into_iter()
                    .filter(|group| group.len() >= min_component_pixels),
            );
        }
    }

    Traced {
        polylines,
        kept,
        dropped,
    }
}

/// Split `members` (sorted pixel ids) into 8-connected groups, in order
/// of each group's first pixel. Each group stays sorted.
fn connected_groups(index: &PixelIndex, members: &[usize], slots: &mut Slots) -> Vec<Vec<usize>> {
    slots.enter(members);
    let mut uf = UnionFind::<usize>::new(members.len());
    for (local, &id) in members.iter().enumerate() {
        for (dx, dy) in FORWARD_NEIGHBORS {
            if let Some(other) = index.neighbor(id, dx, dy).and_then(|n| slots.get(n)) {
                uf.union(local, other);
            }
        }
    }
    slots.leave(members);

    let mut group_of: HashMap<usize, usize> = HashMap::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for (&id, label) in members.iter().zip(uf.into_labeling()) {
        let g = *group_of.entry(label).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[g].push(id);
    }
    groups
}

/// Pixel adjacency graph of one branch. Node `i` is `members[i]`; `slots`
/// must hold the branch.
fn branch_graph(index: &PixelIndex, members: &[usize], slots: &Slots) -> UnGraph<(), f64> {
    let mut graph: UnGraph<(), f64> = UnGraph::with_capacity(members.len(), members.len() * 4);
    for _ in members {
        graph.add_node(());
    }
    for (local, &id) in members.iter().enumerate() {
        for (dx, dy) in FORWARD_NEIGHBORS {
            if let Some(other) = index.neighbor(id, dx, dy).and_then(|n| slots.get(n)) {
                let weight = if dx != 0 && dy != 0 {
                    std::f64::consts::SQRT_2
                } else {
                    1.0
                };
                graph.add_edge(NodeIndex::new(local), NodeIndex::new(other), weight);
            }
        }
    }
    graph
}

/// Longest shortest path through a connected graph, via a double sweep:
/// the node farthest from node 0, then the node farthest from that one.
fn dominant_path(graph: &UnGraph<(), f64>) -> Vec<NodeIndex> {
    if graph.node_count() == 0 {
        return Vec::new();
    }
    let from = farthest(graph, NodeIndex::new(0));
    let to = farthest(graph, from);
    astar(graph, from, |n| n == to, |e| *e.weight(), |_| 0.0)
        .map_or_else(|| vec![from], |(_, path)| path)
}

/// The node with the greatest shortest-path cost from `start`.
///
/// Ties go to the lowest node index so the result is deterministic.
fn farthest(graph: &UnGraph<(), f64>, start: NodeIndex) -> NodeIndex {
    let costs = dijkstra(graph, start, None, |e| *e.weight());
    let mut best = start;
    let mut best_cost = 0.0;
    for node in graph.node_indices() {
        if let Some(&cost) = costs.get(&node)
            && cost > best_cost
        {
            best = node;
            best_cost = cost;
        }
    }
    best
}
