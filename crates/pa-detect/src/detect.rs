//! The detection pipeline and its entry points.
//!
//! ```text
//! Perimeter::new ─► outer_buffer ─► find_start_nodes ─► search_all
//!                                                          │
//!          rank ◄── cluster ◄── score_path (per hit) ◄─────┘
//! ```
//!
//! The pipeline is a pure function of (ring, graph, config): identical
//! inputs give identical candidates and scores.  Only `processing_ms`
//! varies between runs.

use std::sync::Arc;
use std::time::Instant;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use pa_core::{CandidateId, DetectionConfig, GeoPoint, PaResult};
use pa_geometry::Perimeter;
use pa_network::{GraphCache, GraphStats, Node, RoadGraph, Way, ways_along};

use crate::candidate::{EntryCandidate, rank};
use crate::cluster::cluster;
use crate::score::score_path;
use crate::search::{PathHit, find_start_nodes, search_all};

// ── Request / report ──────────────────────────────────────────────────────────

/// Everything one detection needs, in the shape callers send it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionRequest {
    /// Perimeter ring as `[lon, lat]` pairs, open or closed.
    pub polygon: Vec<[f64; 2]>,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub ways: Vec<Way>,
    /// Slot name in the graph cache.  Defaults to the input fingerprint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_key: Option<String>,
    /// Overrides the detector's configuration when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<DetectionConfig>,
}

impl DetectionRequest {
    pub fn ring(&self) -> Vec<GeoPoint> {
        self.polygon.iter().map(|&p| GeoPoint::from(p)).collect()
    }
}

/// Ranked candidates plus figures about the run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionReport {
    /// Confidence descending, then id ascending.
    pub candidates: Vec<EntryCandidate>,
    pub stats: GraphStats,
    pub start_node_count: usize,
    /// Candidates found before clustering.
    pub raw_candidate_count: usize,
    pub processing_ms: f64,
}

// ── Entry points ──────────────────────────────────────────────────────────────

/// Build a graph from `nodes`/`ways` and run the pipeline on it.
///
/// # Errors
///
/// [`PaError::InvalidGeometry`](pa_core::PaError::InvalidGeometry) for a
/// degenerate or malformed ring, [`PaError::Config`](pa_core::PaError::Config)
/// for an invalid configuration.  Empty node or way lists are not errors.
pub fn detect_entries(
    ring:   &[GeoPoint],
    nodes:  &[Node],
    ways:   &[Way],
    config: &DetectionConfig,
) -> PaResult<DetectionReport> {
    let started = Instant::now();
    let perimeter = prepare(ring, config)?;
    let graph = RoadGraph::build(nodes, ways);
    run(&graph, &perimeter, config, started)
}

/// Run the pipeline on a prebuilt graph.
pub fn detect_on_graph(graph: &RoadGraph, ring: &[GeoPoint], config: &DetectionConfig) -> PaResult<DetectionReport> {
    let started = Instant::now();
    let perimeter = prepare(ring, config)?;
    run(graph, &perimeter, config, started)
}

/// Reusable detector with a default configuration and an optional graph
/// cache shared with other detectors or workers.
#[derive(Clone, Default)]
pub struct EntryDetector {
    config: DetectionConfig,
    cache:  Option<Arc<GraphCache>>,
}

impl EntryDetector {
    pub fn new(config: DetectionConfig) -> Self {
        Self { config, cache: None }
    }

    pub fn with_cache(mut self, cache: Arc<GraphCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    pub fn cache(&self) -> Option<&Arc<GraphCache>> {
        self.cache.as_ref()
    }

    /// Run one request.  The request's own config wins over the detector's.
    pub fn detect(&self, request: &DetectionRequest) -> PaResult<DetectionReport> {
        let started = Instant::now();
        let config = request.config.as_ref().unwrap_or(&self.config);
        let perimeter = prepare(&request.ring(), config)?;

        let graph = match &self.cache {
            Some(cache) => cache.get_or_build(request.cache_key.as_deref(), &request.nodes, &request.ways),
            None => Arc::new(RoadGraph::build(&request.nodes, &request.ways)),
        };
        run(&graph, &perimeter, config, started)
    }
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

/// Reject bad input before any graph work is done.
fn prepare(ring: &[GeoPoint], config: &DetectionConfig) -> PaResult<Perimeter> {
    config.validate()?;
    Perimeter::new(ring)
}

fn run(
    graph:     &RoadGraph,
    perimeter: &Perimeter,
    config:    &DetectionConfig,
    started:   Instant,
) -> PaResult<DetectionReport> {
    let stats = graph.stats();

    if graph.is_empty() {
        debug!("empty road graph; nothing to search");
        return Ok(DetectionReport { stats, processing_ms: elapsed_ms(started), ..Default::default() });
    }

    let buffer = perimeter.outer_buffer(config.outer_buffer_m)?;
    let starts = find_start_nodes(graph, perimeter, &buffer);
    info!(
        "{} start nodes within {} m of the perimeter",
        starts.len(),
        config.outer_buffer_m
    );

    let hits = search_all(graph, perimeter, &starts, config);
    let raw: Vec<EntryCandidate> = hits
        .into_iter()
        .enumerate()
        .map(|(i, hit)| build_candidate(graph, CandidateId(i as u32), hit, config))
        .collect();
    let raw_candidate_count = raw.len();

    let mut candidates = cluster(raw, config.cluster_cell_m);
    rank(&mut candidates);

    info!(
        "{} entry candidates kept of {} found",
        candidates.len(),
        raw_candidate_count
    );

    Ok(DetectionReport {
        candidates,
        stats,
        start_node_count: starts.len(),
        raw_candidate_count,
        processing_ms: elapsed_ms(started),
    })
}

fn build_candidate(graph: &RoadGraph, id: CandidateId, hit: PathHit, config: &DetectionConfig) -> EntryCandidate {
    let path_node_ids: Vec<_> = hit.path.iter().map(|&n| graph.node_id(n)).collect();
    let coords: Vec<GeoPoint> = hit.path.iter().map(|&n| graph.pos(n)).collect();
    let way_ids = ways_along(graph, &path_node_ids);
    let score = score_path(graph, &hit.path, &coords, &way_ids, &config.scoring);

    let mut path_geometry = coords;
    path_geometry.push(hit.crossing.point);

    EntryCandidate {
        id,
        intersection_point: hit.crossing.point,
        path_node_ids,
        path_geometry,
        distance_m:       score.distance_m,
        distance_score:   score.distance_score,
        straightness:     score.straightness,
        continuity:       score.continuity,
        road_class_score: score.road_class_score,
        confidence:       score.confidence,
        way_ids,
        start_node: graph.node_id(hit.start),
        manual: false,
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1_000.0
}
