//! The engine's output record.

use serde::{Deserialize, Serialize};

use pa_core::{CandidateId, GeoPoint, NodeId, WayId};

/// One plausible vehicle approach to the perimeter.
///
/// All score fields are in `[0, 1]`.  `path_node_ids` starts at the start
/// node and is connected and cycle-free in the graph it came from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntryCandidate {
    pub id: CandidateId,

    /// Where the path meets the perimeter boundary.
    pub intersection_point: GeoPoint,

    pub path_node_ids: Vec<NodeId>,
    /// Node coordinates along the path followed by `intersection_point`.
    pub path_geometry: Vec<GeoPoint>,

    /// Path length over the node coordinates, metres.  Always `> 0`.
    pub distance_m:       f64,
    pub distance_score:   f64,
    pub straightness:     f64,
    pub continuity:       f64,
    pub road_class_score: f64,
    pub confidence:       f64,

    /// Distinct ways covering the path, in path order.
    pub way_ids: Vec<WayId>,

    pub start_node: NodeId,

    /// `false` for everything the engine produces.  Callers set it on
    /// hand-drawn entries they add to the result.
    #[serde(default)]
    pub manual: bool,
}

impl EntryCandidate {
    /// Number of nodes on the path.
    pub fn path_len(&self) -> usize {
        self.path_node_ids.len()
    }
}

/// Confidence descending, then id ascending.
pub(crate) fn rank(candidates: &mut [EntryCandidate]) {
    candidates.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| a.id.cmp(&b.id))
    });
}
