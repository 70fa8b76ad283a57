//! Bounded per-start-node search for the first boundary crossing.
//!
//! # Algorithm
//!
//! From each start node a traversal expands the road graph until some edge
//! `v–u` has a straight segment that meets the perimeter boundary.  Every
//! edge out of an expanded node is tested except the one back to its
//! predecessor, which was tested from the other side.  The first hit ends the
//! search for that start node.
//!
//! Two frontier orders are available (see [`Traversal`]).  Both visit the
//! same connected component, so they find a hit for the same start nodes as
//! long as the visit ceiling is not reached; best-first usually gets there
//! with fewer expansions because it heads for the perimeter centroid.
//!
//! Start nodes run independently of each other.  With the `parallel` feature
//! they run on the Rayon pool; results come back in start-node order either
//! way.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};

use log::trace;
use rustc_hash::FxHashMap;

use pa_core::{DetectionConfig, NodeId, Traversal};
use pa_geometry::{Crossing, OuterBuffer, Perimeter};
use pa_network::{NodeIdx, RoadGraph};

/// A path from a start node whose last edge meets the boundary.
#[derive(Clone, Debug)]
pub struct PathHit {
    pub start:    NodeIdx,
    /// Start node first.  Connected and free of repeated nodes.
    pub path:     Vec<NodeIdx>,
    pub crossing: Crossing,
}

// ── Start nodes ───────────────────────────────────────────────────────────────

/// Nodes inside `buffer` but not inside `perimeter`, ascending by [`NodeId`].
pub fn find_start_nodes(graph: &RoadGraph, perimeter: &Perimeter, buffer: &OuterBuffer<'_>) -> Vec<NodeIdx> {
    let (south_west, north_east) = buffer.bounds();
    let candidates = graph.grid().within_bounds(south_west, north_east);

    let mut starts: Vec<NodeIdx> = candidates
        .into_iter()
        .filter(|&n| {
            let p = graph.pos(n);
            !perimeter.contains(p) && buffer.contains(p)
        })
        .collect();
    starts.sort_unstable_by_key(|&n| graph.node_id(n));
    starts
}

// ── Search ────────────────────────────────────────────────────────────────────

/// Run [`search_from`] for every start node, keeping the order of `starts`.
pub fn search_all(
    graph:     &RoadGraph,
    perimeter: &Perimeter,
    starts:    &[NodeIdx],
    config:    &DetectionConfig,
) -> Vec<PathHit> {
    #[cfg(not(feature = "parallel"))]
    {
        starts
            .iter()
            .filter_map(|&s| search_from(graph, perimeter, s, config))
            .collect()
    }

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;

        // Indexed parallel iterators collect in input order.
        starts
            .par_iter()
            .filter_map(|&s| search_from(graph, perimeter, s, config))
            .collect()
    }
}

/// Search outward from `start` for the first edge meeting the boundary.
///
/// Returns `None` when the reachable part of the graph has no crossing edge
/// or the visit ceiling is reached first.
pub fn search_from(
    graph:     &RoadGraph,
    perimeter: &Perimeter,
    start:     NodeIdx,
    config:    &DetectionConfig,
) -> Option<PathHit> {
    let start_pos = graph.pos(start);
    let mut pred: FxHashMap<NodeIdx, Option<NodeIdx>> = FxHashMap::default();
    let mut frontier = Frontier::new(config.traversal);

    pred.insert(start, None);
    frontier.push(graph, perimeter, start);

    let mut expanded = 0usize;
    while let Some(v) = frontier.pop() {
        if expanded >= config.max_visited_nodes {
            trace!(
                "start node {}: visit ceiling of {} reached without a crossing",
                graph.node_id(start),
                config.max_visited_nodes
            );
            return None;
        }
        expanded += 1;

        let parent = pred.get(&v).copied().flatten();
        let v_pos = graph.pos(v);

        for &u in graph.neighbors(v) {
            if Some(u) == parent {
                continue;
            }
            if let Some(crossing) = perimeter.first_crossing(v_pos, graph.pos(u)) {
                let path = close_path(&pred, v, u);
                return Some(PathHit { start, path, crossing });
            }
            if pred.contains_key(&u) {
                continue;
            }
            if let Some(r) = config.search_radius_m {
                if start_pos.distance_m(graph.pos(u)) > r {
                    continue;
                }
            }
            pred.insert(u, Some(v));
            frontier.push(graph, perimeter, u);
        }
    }
    None
}

/// Path from the start node to `v`, then `u`.
///
/// If `u` already lies on that path the result is start…`u`, `v` instead, so
/// no node appears twice.
fn close_path(pred: &FxHashMap<NodeIdx, Option<NodeIdx>>, v: NodeIdx, u: NodeIdx) -> Vec<NodeIdx> {
    let mut path = vec![v];
    let mut cur = v;
    while let Some(&Some(p)) = pred.get(&cur) {
        path.push(p);
        cur = p;
    }
    path.reverse();

    match path.iter().position(|&n| n == u) {
        Some(i) => {
            path.truncate(i + 1);
            path.push(v);
        }
        None => path.push(u),
    }
    path
}

// ── Frontier ──────────────────────────────────────────────────────────────────

enum Frontier {
    Fifo(VecDeque<NodeIdx>),
    // Min-heap on (millimetres to the perimeter centroid, NodeId, index).
    // NodeId breaks ties so the order does not depend on input order.
    Nearest(BinaryHeap<Reverse<(u64, NodeId, NodeIdx)>>),
}

impl Frontier {
    fn new(traversal: Traversal) -> Self {
        match traversal {
            Traversal::BreadthFirst => Self::Fifo(VecDeque::new()),
            Traversal::BestFirst    => Self::Nearest(BinaryHeap::new()),
        }
    }

    fn push(&mut self, graph: &RoadGraph, perimeter: &Perimeter, n: NodeIdx) {
        match self {
            Self::Fifo(q) => q.push_back(n),
            Self::Nearest(h) => {
                let [x, y] = perimeter.frame().project(graph.pos(n));
                let mm = (x.hypot(y) * 1_000.0) as u64;
                h.push(Reverse((mm, graph.node_id(n), n)));
            }
        }
    }

    fn pop(&mut self) -> Option<NodeIdx> {
        match self {
            Self::Fifo(q) => q.pop_front(),
            Self::Nearest(h) => h.pop().map(|Reverse((_, _, n))| n),
        }
    }
}
