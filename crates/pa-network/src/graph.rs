//! Undirected road graph and its builder.
//!
//! # Data layout
//!
//! Nodes get a dense [`NodeIdx`] in input order.  Adjacency is stored in
//! **Compressed Sparse Row (CSR)** form: the neighbours of node `n` occupy
//!
//! ```text
//! adj[ adj_start[n] .. adj_start[n+1] ]
//! ```
//!
//! sorted by the neighbour's [`NodeId`], so every traversal expands
//! neighbours in the same order regardless of input order.  Each undirected
//! edge appears twice (once per endpoint) and at most once per endpoint even
//! when several ways share it.
//!
//! Which ways cover an edge is kept separately, keyed by [`EdgeKey`].

use log::{debug, info, warn};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use pa_core::{GeoPoint, NodeId, Tags, WayId};

use crate::grid::SpatialGrid;

// ── Input records ─────────────────────────────────────────────────────────────

/// A road node as supplied by the data source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id:  NodeId,
    pub lon: f64,
    pub lat: f64,
}

impl Node {
    pub fn new(id: i64, lon: f64, lat: f64) -> Self {
        Self { id: NodeId(id), lon, lat }
    }

    #[inline]
    pub fn pos(&self) -> GeoPoint {
        GeoPoint::new(self.lon, self.lat)
    }
}

/// An ordered run of nodes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Way {
    pub id: WayId,

    #[serde(alias = "node_ids", alias = "nodeIds")]
    pub nodes: Vec<NodeId>,

    #[serde(default, skip_serializing_if = "Tags::is_empty")]
    pub tags: Tags,
}

impl Way {
    pub fn new(id: i64, nodes: impl IntoIterator<Item = i64>) -> Self {
        Self {
            id:    WayId(id),
            nodes: nodes.into_iter().map(NodeId).collect(),
            tags:  Tags::new(),
        }
    }

    /// Builder-style tag setter.
    pub fn tag(mut self, key: &str, value: &str) -> Self {
        self.tags.insert(key.to_owned(), value.to_owned());
        self
    }
}

// ── Keys and indices ──────────────────────────────────────────────────────────

/// Dense index of a node inside one [`RoadGraph`].
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct NodeIdx(pub u32);

impl NodeIdx {
    #[inline(always)]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Unordered node pair identifying an undirected edge.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct EdgeKey(NodeId, NodeId);

impl EdgeKey {
    pub fn new(a: NodeId, b: NodeId) -> Self {
        if a <= b { EdgeKey(a, b) } else { EdgeKey(b, a) }
    }

    pub fn endpoints(self) -> (NodeId, NodeId) {
        (self.0, self.1)
    }
}

/// Size figures reported with every detection result.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub way_count:  usize,
    /// Σ over edges of the ways covering it; an edge shared by two ways
    /// counts twice.
    pub edge_instance_count: usize,
}

// ── RoadGraph ─────────────────────────────────────────────────────────────────

/// Immutable undirected road graph plus its spatial grid.
///
/// Construct with [`RoadGraph::build`] or [`RoadGraphBuilder`].
pub struct RoadGraph {
    node_ids:  Vec<NodeId>,
    node_pos:  Vec<GeoPoint>,
    index_of:  FxHashMap<NodeId, NodeIdx>,

    adj_start: Vec<u32>,
    adj:       Vec<NodeIdx>,

    ways:      Vec<Way>,
    way_index: FxHashMap<WayId, u32>,

    edge_ways:           FxHashMap<EdgeKey, Vec<WayId>>,
    edge_instance_count: usize,

    grid: SpatialGrid,
}

impl RoadGraph {
    /// Build a graph from node and way lists.  Never fails; see
    /// [`RoadGraphBuilder::build`] for how bad records are handled.
    pub fn build(nodes: &[Node], ways: &[Way]) -> Self {
        let mut b = RoadGraphBuilder::with_capacity(nodes.len(), ways.len());
        b.extend_nodes(nodes.iter().cloned());
        b.extend_ways(ways.iter().cloned());
        b.build()
    }

    pub fn empty() -> Self {
        RoadGraphBuilder::new().build()
    }

    // ── Dimensions ────────────────────────────────────────────────────────

    pub fn node_count(&self) -> usize {
        self.node_ids.len()
    }

    pub fn way_count(&self) -> usize {
        self.ways.len()
    }

    /// Distinct undirected edges.
    pub fn edge_count(&self) -> usize {
        self.edge_ways.len()
    }

    pub fn edge_instance_count(&self) -> usize {
        self.edge_instance_count
    }

    pub fn is_empty(&self) -> bool {
        self.node_ids.is_empty()
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            node_count:          self.node_count(),
            way_count:           self.way_count(),
            edge_instance_count: self.edge_instance_count,
        }
    }

    // ── Node access ───────────────────────────────────────────────────────

    #[inline]
    pub fn index_of(&self, id: NodeId) -> Option<NodeIdx> {
        self.index_of.get(&id).copied()
    }

    #[inline]
    pub fn node_id(&self, idx: NodeIdx) -> NodeId {
        self.node_ids[idx.index()]
    }

    #[inline]
    pub fn pos(&self, idx: NodeIdx) -> GeoPoint {
        self.node_pos[idx.index()]
    }

    pub fn node_indices(&self) -> impl Iterator<Item = NodeIdx> + '_ {
        (0..self.node_ids.len() as u32).map(NodeIdx)
    }

    // ── Adjacency ─────────────────────────────────────────────────────────

    /// Neighbours of `node`, ascending by [`NodeId`].
    #[inline]
    pub fn neighbors(&self, node: NodeIdx) -> &[NodeIdx] {
        let start = self.adj_start[node.index()] as usize;
        let end   = self.adj_start[node.index() + 1] as usize;
        &self.adj[start..end]
    }

    #[inline]
    pub fn degree(&self, node: NodeIdx) -> usize {
        let start = self.adj_start[node.index()] as usize;
        let end   = self.adj_start[node.index() + 1] as usize;
        end - start
    }

    pub fn are_adjacent(&self, a: NodeId, b: NodeId) -> bool {
        self.edge_ways.contains_key(&EdgeKey::new(a, b))
    }

    // ── Ways ──────────────────────────────────────────────────────────────

    /// Ways covering the edge `a`–`b`, in first-seen order.  Empty if the
    /// nodes are not adjacent.
    pub fn ways_on_edge(&self, a: NodeId, b: NodeId) -> &[WayId] {
        self.edge_ways
            .get(&EdgeKey::new(a, b))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn way(&self, id: WayId) -> Option<&Way> {
        self.way_index.get(&id).map(|&i| &self.ways[i as usize])
    }

    pub fn ways(&self) -> &[Way] {
        &self.ways
    }

    // ── Spatial ───────────────────────────────────────────────────────────

    pub fn grid(&self) -> &SpatialGrid {
        &self.grid
    }
}

// ── RoadGraphBuilder ──────────────────────────────────────────────────────────

/// Collect nodes and ways in any order, then call [`build`](Self::build).
///
/// # Example
///
/// ```
/// use pa_network::{Node, RoadGraphBuilder, Way};
///
/// let mut b = RoadGraphBuilder::new();
/// b.add_node(Node::new(1, 0.0, 0.0));
/// b.add_node(Node::new(2, 0.001, 0.0));
/// b.add_way(Way::new(10, [1, 2]).tag("highway", "residential"));
/// let graph = b.build();
/// assert_eq!(graph.node_count(), 2);
/// assert_eq!(graph.edge_count(), 1);
/// ```
pub struct RoadGraphBuilder {
    nodes: Vec<Node>,
    ways:  Vec<Way>,
}

impl RoadGraphBuilder {
    pub fn new() -> Self {
        Self { nodes: Vec::new(), ways: Vec::new() }
    }

    pub fn with_capacity(nodes: usize, ways: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(nodes),
            ways:  Vec::with_capacity(ways),
        }
    }

    pub fn add_node(&mut self, node: Node) {
        self.nodes.push(node);
    }

    pub fn add_way(&mut self, way: Way) {
        self.ways.push(way);
    }

    pub fn extend_nodes(&mut self, nodes: impl IntoIterator<Item = Node>) {
        self.nodes.extend(nodes);
    }

    pub fn extend_ways(&mut self, ways: impl IntoIterator<Item = Way>) {
        self.ways.extend(ways);
    }

    /// Consume the builder and produce a [`RoadGraph`].
    ///
    /// - Nodes with non-finite or out-of-range coordinates are dropped.
    /// - For duplicate node or way ids the first record wins.
    /// - A way step whose endpoint is unknown (or dropped) skips only that
    ///   connection; the rest of the way is still connected.
    /// - Repeated consecutive ids (`a, a`) are not edges.
    ///
    /// Time complexity: O(E log E) for the adjacency sort plus the grid
    /// build, where E = way steps.
    pub fn build(self) -> RoadGraph {
        // ── Nodes ─────────────────────────────────────────────────────────
        let mut node_ids = Vec::with_capacity(self.nodes.len());
        let mut node_pos = Vec::with_capacity(self.nodes.len());
        let mut index_of: FxHashMap<NodeId, NodeIdx> =
            FxHashMap::with_capacity_and_hasher(self.nodes.len(), Default::default());

        for node in &self.nodes {
            let pos = node.pos();
            if !pos.is_valid() {
                warn!("dropping node {} with malformed coordinates {pos}", node.id);
                continue;
            }
            if index_of.contains_key(&node.id) {
                warn!("duplicate node id {}; keeping the first record", node.id);
                continue;
            }
            index_of.insert(node.id, NodeIdx(node_ids.len() as u32));
            node_ids.push(node.id);
            node_pos.push(pos);
        }

        // ── Ways and edges ────────────────────────────────────────────────
        let mut ways = Vec::with_capacity(self.ways.len());
        let mut way_index: FxHashMap<WayId, u32> = FxHashMap::default();
        let mut edge_ways: FxHashMap<EdgeKey, Vec<WayId>> = FxHashMap::default();
        let mut edge_instance_count = 0usize;
        let mut skipped = 0usize;

        for way in self.ways {
            if way_index.contains_key(&way.id) {
                warn!("duplicate way id {}; keeping the first record", way.id);
                continue;
            }

            for pair in way.nodes.windows(2) {
                let (a, b) = (pair[0], pair[1]);
                if a == b {
                    continue;
                }
                if !(index_of.contains_key(&a) && index_of.contains_key(&b)) {
                    debug!("way {}: skipping connection {a}–{b} (missing node)", way.id);
                    skipped += 1;
                    continue;
                }
                let covering = edge_ways.entry(EdgeKey::new(a, b)).or_default();
                if !covering.contains(&way.id) {
                    covering.push(way.id);
                    edge_instance_count += 1;
                }
            }

            way_index.insert(way.id, ways.len() as u32);
            ways.push(way);
        }

        // ── CSR adjacency ─────────────────────────────────────────────────
        let node_count = node_ids.len();
        let mut half_edges: Vec<(NodeIdx, NodeIdx)> = Vec::with_capacity(edge_ways.len() * 2);
        for key in edge_ways.keys() {
            let (a, b) = key.endpoints();
            let (ia, ib) = (index_of[&a], index_of[&b]);
            half_edges.push((ia, ib));
            half_edges.push((ib, ia));
        }
        half_edges.sort_unstable_by_key(|&(from, to)| (from, node_ids[to.index()]));

        let mut adj_start = vec![0u32; node_count + 1];
        for &(from, _) in &half_edges {
            adj_start[from.index() + 1] += 1;
        }
        for i in 1..=node_count {
            adj_start[i] += adj_start[i - 1];
        }
        let adj: Vec<NodeIdx> = half_edges.into_iter().map(|(_, to)| to).collect();
        debug_assert_eq!(adj_start[node_count] as usize, adj.len());

        let grid = SpatialGrid::build(&node_pos);

        if node_count > 0 {
            info!(
                "road graph: {} nodes, {} ways, {} edges ({} instances), {} connections skipped",
                node_count,
                ways.len(),
                edge_ways.len(),
                edge_instance_count,
                skipped
            );
        }

        RoadGraph {
            node_ids,
            node_pos,
            index_of,
            adj_start,
            adj,
            ways,
            way_index,
            edge_ways,
            edge_instance_count,
            grid,
        }
    }
}

impl Default for RoadGraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Distinct way ids covering consecutive steps of `path`, in path order.
pub fn ways_along(graph: &RoadGraph, path: &[NodeId]) -> Vec<WayId> {
    let mut seen = FxHashSet::default();
    let mut out = Vec::new();
    for pair in path.windows(2) {
        for &w in graph.ways_on_edge(pair[0], pair[1]) {
            if seen.insert(w) {
                out.push(w);
            }
        }
    }
    out
}
