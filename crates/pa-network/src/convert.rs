//! Polyline → node/way conversion for sources without node identities.
//!
//! Some road sources (GeoJSON `LineString`s, digitised plans) deliver only
//! geometry.  Vertices at exactly the same coordinate become one shared node
//! so crossing lines are connected; everything else gets a fresh id from the
//! caller's [`IdSequence`].
//!
//! # Usage
//!
//! ```
//! use pa_core::{GeoPoint, IdSequence};
//! use pa_network::convert::{RoadLine, from_polylines};
//!
//! let lines = vec![
//!     RoadLine::new(vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(0.001, 0.0)]),
//!     RoadLine::new(vec![GeoPoint::new(0.001, 0.0), GeoPoint::new(0.001, 0.001)]),
//! ];
//! let (nodes, ways) = from_polylines(&lines, &mut IdSequence::new());
//! assert_eq!(nodes.len(), 3); // the shared corner is one node
//! assert_eq!(ways.len(), 2);
//! ```

use log::debug;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use pa_core::{GeoPoint, IdSequence, NodeId, Tags};

use crate::graph::{Node, Way};

/// One road polyline with optional tags.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoadLine {
    pub coords: Vec<GeoPoint>,
    #[serde(default)]
    pub tags: Tags,
}

impl RoadLine {
    pub fn new(coords: Vec<GeoPoint>) -> Self {
        Self { coords, tags: Tags::new() }
    }

    pub fn tag(mut self, key: &str, value: &str) -> Self {
        self.tags.insert(key.to_owned(), value.to_owned());
        self
    }
}

/// Convert polylines into node and way lists.
///
/// Lines with fewer than two distinct consecutive vertices produce no way.
/// Repeated consecutive vertices are collapsed.
pub fn from_polylines(lines: &[RoadLine], ids: &mut IdSequence) -> (Vec<Node>, Vec<Way>) {
    let mut nodes: Vec<Node> = Vec::new();
    let mut ways: Vec<Way> = Vec::with_capacity(lines.len());
    let mut by_coord: FxHashMap<(u64, u64), NodeId> = FxHashMap::default();

    for (i, line) in lines.iter().enumerate() {
        let mut refs: Vec<NodeId> = Vec::with_capacity(line.coords.len());
        for &p in &line.coords {
            let id = *by_coord.entry(p.bits()).or_insert_with(|| {
                let id = ids.next_node();
                nodes.push(Node { id, lon: p.lon, lat: p.lat });
                id
            });
            if refs.last() != Some(&id) {
                refs.push(id);
            }
        }

        if refs.len() < 2 {
            debug!("polyline {i} has fewer than two distinct vertices; skipped");
            continue;
        }
        ways.push(Way { id: ids.next_way(), nodes: refs, tags: line.tags.clone() });
    }

    (nodes, ways)
}
