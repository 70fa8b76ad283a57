//! Unit tests for pa-detect.
//!
//! Fixtures are hand-built road layouts around a square perimeter, plus
//! seeded random lattices for the property checks.

#[cfg(test)]
mod helpers {
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    use pa_core::{CandidateId, GeoPoint, NodeId};
    use pa_network::{Node, Way};

    use crate::EntryCandidate;

    /// Metres → degrees near the equator.
    pub fn deg(m: f64) -> f64 {
        m / pa_core::geo::METRES_PER_DEGREE
    }

    /// One-degree square, clockwise and open.
    pub fn degree_square() -> Vec<GeoPoint> {
        [[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0]]
            .into_iter()
            .map(GeoPoint::from)
            .collect()
    }

    /// ~111 m square centred on (0.0005, 0.0005).
    pub fn block_square() -> Vec<GeoPoint> {
        [[0.0, 0.0], [0.001, 0.0], [0.001, 0.001], [0.0, 0.001]]
            .into_iter()
            .map(GeoPoint::from)
            .collect()
    }

    /// ~111 m square centred on the origin.
    pub fn centred_square() -> Vec<GeoPoint> {
        [[-0.0005, -0.0005], [0.0005, -0.0005], [0.0005, 0.0005], [-0.0005, 0.0005]]
            .into_iter()
            .map(GeoPoint::from)
            .collect()
    }

    /// Two ways crossing the one-degree square from just outside its west
    /// and east edges, joined by a purely interior way.
    ///
    /// ```text
    ///   o1 ─ e1 ─ i1 ══ i2 ─ e2 ─ o2
    ///        │              │
    ///       west           east
    /// ```
    pub fn crossing_ways() -> (Vec<Node>, Vec<Way>) {
        let nodes = vec![
            Node::new(1, -0.000001, 0.3), // o1, ~0.11 m west of the edge
            Node::new(2, 0.0, 0.3),       // e1, on the edge
            Node::new(3, 0.3, 0.3),       // i1
            Node::new(4, 1.000001, 0.7),  // o2
            Node::new(5, 1.0, 0.7),       // e2
            Node::new(6, 0.7, 0.7),       // i2
        ];
        let ways = vec![
            Way::new(100, [1, 2, 3]).tag("highway", "secondary"),
            Way::new(101, [4, 5, 6]).tag("highway", "residential"),
            Way::new(102, [3, 6]).tag("highway", "service"),
        ];
        (nodes, ways)
    }

    /// Two parallel roads 10 m apart entering the west edge of
    /// [`block_square`]: a primary and a footway.
    pub fn twin_roads() -> (Vec<Node>, Vec<Way>) {
        let nodes = vec![
            Node::new(1, -deg(20.0), 0.0005),
            Node::new(2, 0.0002, 0.0005),
            Node::new(3, -deg(20.0), 0.0005 + deg(10.0)),
            Node::new(4, 0.0002, 0.0005 + deg(10.0)),
        ];
        let ways = vec![
            Way::new(200, [1, 2]).tag("highway", "primary"),
            Way::new(201, [3, 4]).tag("highway", "footway"),
        ];
        (nodes, ways)
    }

    /// A road that runs 10 m outside the west edge of [`block_square`] before
    /// turning in:  1 → 2 along the edge, then 2 → 3 across it.
    pub fn dog_leg() -> (Vec<Node>, Vec<Way>) {
        let nodes = vec![
            Node::new(1, -deg(10.0), 0.0002),
            Node::new(2, -deg(10.0), 0.0004),
            Node::new(3, 0.0002, 0.0004),
        ];
        let ways = vec![Way::new(300, [1, 2, 3]).tag("highway", "tertiary")];
        (nodes, ways)
    }

    /// [`centred_square`] with an 11 m wide slot cut 77 m down from the
    /// north side.
    pub fn slotted_square() -> Vec<GeoPoint> {
        [
            [-0.0005, -0.0005], [0.0005, -0.0005], [0.0005, 0.0005], [0.00005, 0.0005],
            [0.00005, -0.0002], [-0.00005, -0.0002], [-0.00005, 0.0005], [-0.0005, 0.0005],
        ]
        .into_iter()
        .map(GeoPoint::from)
        .collect()
    }

    /// 200 m square with a 20 m wide, 150 m deep slot from the north side,
    /// laid out in metres from the origin.
    pub fn deep_slot() -> Vec<GeoPoint> {
        [
            (0.0, 0.0), (200.0, 0.0), (200.0, 200.0), (110.0, 200.0),
            (110.0, 50.0), (90.0, 50.0), (90.0, 200.0), (0.0, 200.0),
        ]
        .into_iter()
        .map(|(e, n)| GeoPoint::new(deg(e), deg(n)))
        .collect()
    }

    const CLASSES: [&str; 6] = ["primary", "secondary", "residential", "service", "track", "footway"];

    /// Jittered 15 × 15 street lattice at ~22 m spacing around
    /// [`centred_square`].  Every row and every column is one way.
    pub fn lattice(seed: u64) -> (Vec<Node>, Vec<Way>) {
        const N: i64 = 15;
        let mut rng = SmallRng::seed_from_u64(seed);

        let mut nodes = Vec::with_capacity((N * N) as usize);
        for r in 0..N {
            for c in 0..N {
                let lon = -0.0014 + c as f64 * 0.0002 + rng.gen_range(-0.00003..0.00003);
                let lat = -0.0014 + r as f64 * 0.0002 + rng.gen_range(-0.00003..0.00003);
                nodes.push(Node::new(r * N + c + 1, lon, lat));
            }
        }

        let mut ways = Vec::with_capacity(2 * N as usize);
        for r in 0..N {
            let class = CLASSES[rng.gen_range(0..CLASSES.len())];
            ways.push(Way::new(1_000 + r, (0..N).map(|c| r * N + c + 1)).tag("highway", class));
        }
        for c in 0..N {
            let class = CLASSES[rng.gen_range(0..CLASSES.len())];
            ways.push(Way::new(2_000 + c, (0..N).map(|r| r * N + c + 1)).tag("highway", class));
        }
        (nodes, ways)
    }

    /// Bare candidate for clustering and ranking tests.
    pub fn candidate(id: u32, lon: f64, lat: f64, confidence: f64) -> EntryCandidate {
        EntryCandidate {
            id: CandidateId(id),
            intersection_point: GeoPoint::new(lon, lat),
            path_node_ids: vec![NodeId(1), NodeId(2)],
            path_geometry: vec![GeoPoint::new(lon, lat)],
            distance_m: 10.0,
            distance_score: 0.05,
            straightness: 1.0,
            continuity: 0.25,
            road_class_score: 0.5,
            confidence,
            way_ids: vec![],
            start_node: NodeId(1),
            manual: false,
        }
    }
}

// ── Scenarios ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod scenarios {
    use pa_core::{DetectionConfig, GeoPoint, NodeId, PaError, WayId};
    use pa_network::{Node, Way};

    use crate::detect_entries;
    use super::helpers::{block_square, crossing_ways, degree_square, twin_roads};

    #[test]
    fn two_crossing_ways_give_two_candidates() {
        let (nodes, ways) = crossing_ways();
        let report = detect_entries(&degree_square(), &nodes, &ways, &DetectionConfig::with_buffer(0.2)).unwrap();

        assert!(report.candidates.len() >= 2, "{report:?}");
        for c in &report.candidates {
            assert!(!c.path_node_ids.is_empty());
            assert!(c.distance_m > 0.0);
            assert!(!c.manual);
        }
        let west = report
            .candidates
            .iter()
            .find(|c| c.start_node == NodeId(1))
            .expect("west approach");
        assert_eq!(west.path_node_ids, vec![NodeId(1), NodeId(2)]);
        assert_eq!(west.way_ids, vec![WayId(100)]);
        assert!(west.intersection_point.lon.abs() < 1e-9);
        assert!((west.intersection_point.lat - 0.3).abs() < 1e-9);

        assert_eq!(report.stats.node_count, 6);
        assert_eq!(report.stats.way_count, 3);
        assert_eq!(report.stats.edge_instance_count, 5);
    }

    #[test]
    fn interior_way_gives_nothing() {
        let nodes = vec![Node::new(3, 0.3, 0.3), Node::new(6, 0.7, 0.7)];
        let ways = vec![Way::new(102, [3, 6])];
        let report = detect_entries(&degree_square(), &nodes, &ways, &DetectionConfig::with_buffer(0.2)).unwrap();
        assert_eq!(report.start_node_count, 0);
        assert!(report.candidates.is_empty());
    }

    #[test]
    fn distant_way_gives_nothing() {
        let nodes = vec![Node::new(1, -0.5, 0.3), Node::new(2, -0.4, 0.3)];
        let ways = vec![Way::new(1, [1, 2])];
        let report = detect_entries(&degree_square(), &nodes, &ways, &DetectionConfig::with_buffer(0.2)).unwrap();
        assert_eq!(report.start_node_count, 0);
        assert!(report.candidates.is_empty());
    }

    #[test]
    fn way_along_the_boundary_gives_nothing() {
        // Both nodes in the buffer, road parallel to the west edge.
        let nodes = vec![Node::new(1, -0.000001, 0.2), Node::new(2, -0.000001, 0.4)];
        let ways = vec![Way::new(1, [1, 2])];
        let report = detect_entries(&degree_square(), &nodes, &ways, &DetectionConfig::with_buffer(0.2)).unwrap();
        assert_eq!(report.start_node_count, 2);
        assert!(report.candidates.is_empty());
        assert_eq!(report.raw_candidate_count, 0);
    }

    #[test]
    fn nearby_hits_collapse_to_the_stronger() {
        let (nodes, ways) = twin_roads();
        let report = detect_entries(&block_square(), &nodes, &ways, &DetectionConfig::default()).unwrap();

        assert_eq!(report.start_node_count, 2);
        assert_eq!(report.raw_candidate_count, 2);
        assert_eq!(report.candidates.len(), 1);

        let kept = &report.candidates[0];
        assert_eq!(kept.start_node, NodeId(1));
        assert_eq!(kept.way_ids, vec![WayId(200)]);
        assert!((kept.road_class_score - 0.9).abs() < 1e-12);
    }

    #[test]
    fn hits_in_separate_cells_both_survive() {
        let (nodes, ways) = twin_roads();
        let config = DetectionConfig { cluster_cell_m: 1.0, ..DetectionConfig::default() };
        let report = detect_entries(&block_square(), &nodes, &ways, &config).unwrap();
        assert_eq!(report.candidates.len(), 2);
        assert!(report.candidates[0].confidence >= report.candidates[1].confidence);
    }

    #[test]
    fn empty_input_is_not_an_error() {
        let report = detect_entries(&block_square(), &[], &[], &DetectionConfig::default()).unwrap();
        assert!(report.candidates.is_empty());
        assert_eq!(report.stats, pa_network::GraphStats::default());
        assert_eq!(report.start_node_count, 0);
        assert_eq!(report.raw_candidate_count, 0);
    }

    #[test]
    fn degenerate_polygon_is_rejected() {
        let (nodes, ways) = twin_roads();
        let ring = [GeoPoint::new(0.0, 0.0), GeoPoint::new(0.001, 0.0)];
        let err = detect_entries(&ring, &nodes, &ways, &DetectionConfig::default()).unwrap_err();
        assert!(matches!(err, PaError::InvalidGeometry(_)));

        let mut ring = block_square();
        ring[1].lat = f64::INFINITY;
        let err = detect_entries(&ring, &nodes, &ways, &DetectionConfig::default()).unwrap_err();
        assert!(matches!(err, PaError::InvalidGeometry(_)));
    }

    #[test]
    fn bad_buffer_is_rejected() {
        let (nodes, ways) = twin_roads();
        for b in [0.0, -5.0, 1_000.5, f64::NAN] {
            let err = detect_entries(&block_square(), &nodes, &ways, &DetectionConfig::with_buffer(b)).unwrap_err();
            assert!(matches!(err, PaError::Config(_)), "buffer {b}");
        }
    }

    #[test]
    fn closed_ring_matches_open_ring() {
        let (nodes, ways) = twin_roads();
        let mut closed = block_square();
        closed.push(closed[0]);
        let a = detect_entries(&block_square(), &nodes, &ways, &DetectionConfig::default()).unwrap();
        let b = detect_entries(&closed, &nodes, &ways, &DetectionConfig::default()).unwrap();
        assert_eq!(a.candidates, b.candidates);
    }
}

// ── Search ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod search {
    use pa_core::{DetectionConfig, GeoPoint, NodeId, Traversal};
    use pa_geometry::Perimeter;
    use pa_network::{Node, RoadGraph, Way};

    use crate::detect_entries;
    use crate::search::{find_start_nodes, search_from};
    use super::helpers::{block_square, dog_leg, lattice, centred_square};

    #[test]
    fn start_nodes_are_in_the_annulus_sorted_by_id() {
        let (nodes, ways) = lattice(7);
        let graph = RoadGraph::build(&nodes, &ways);
        let perimeter = Perimeter::new(&centred_square()).unwrap();
        let buffer = perimeter.outer_buffer(30.0).unwrap();

        let starts = find_start_nodes(&graph, &perimeter, &buffer);
        assert!(!starts.is_empty());
        let ids: Vec<NodeId> = starts.iter().map(|&n| graph.node_id(n)).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        for &n in &starts {
            assert!(buffer.contains(graph.pos(n)));
            assert!(!perimeter.contains(graph.pos(n)));
        }
        // Nothing qualifying was missed.
        let expected = graph
            .node_indices()
            .filter(|&n| buffer.contains(graph.pos(n)) && !perimeter.contains(graph.pos(n)))
            .count();
        assert_eq!(starts.len(), expected);
    }

    #[test]
    fn start_nodes_found_when_roads_reach_far_away() {
        // Perimeter at 45° N; one long road pulls the data's centre a
        // degree north, well away from the perimeter's own frame.
        let shift = |p: GeoPoint| GeoPoint::new(10.0 + p.lon, 45.0 + p.lat);
        let (mut nodes, mut ways) = lattice(5);
        for n in &mut nodes {
            let p = shift(n.pos());
            n.lon = p.lon;
            n.lat = p.lat;
        }
        nodes.push(Node::new(9_999, 10.0, 47.0));
        ways.push(Way::new(9_999, [1, 9_999]));

        let ring: Vec<GeoPoint> = centred_square().into_iter().map(shift).collect();
        let graph = RoadGraph::build(&nodes, &ways);
        let perimeter = Perimeter::new(&ring).unwrap();
        let buffer = perimeter.outer_buffer(60.0).unwrap();

        let starts = find_start_nodes(&graph, &perimeter, &buffer);
        let expected = graph
            .node_indices()
            .filter(|&n| buffer.contains(graph.pos(n)) && !perimeter.contains(graph.pos(n)))
            .count();
        assert!(expected > 0);
        assert_eq!(starts.len(), expected);
    }

    #[test]
    fn longer_approach_is_followed() {
        let (nodes, ways) = dog_leg();
        let graph = RoadGraph::build(&nodes, &ways);
        let perimeter = Perimeter::new(&block_square()).unwrap();
        let start = graph.index_of(NodeId(1)).unwrap();

        let hit = search_from(&graph, &perimeter, start, &DetectionConfig::default()).expect("hit");
        let ids: Vec<NodeId> = hit.path.iter().map(|&n| graph.node_id(n)).collect();
        assert_eq!(ids, vec![NodeId(1), NodeId(2), NodeId(3)]);
        assert!(hit.crossing.point.lon.abs() < 1e-9);
    }

    #[test]
    fn visit_ceiling_stops_the_search() {
        let (nodes, ways) = dog_leg();
        let ceiling = DetectionConfig { max_visited_nodes: 1, ..DetectionConfig::default() };

        let full = detect_entries(&block_square(), &nodes, &ways, &DetectionConfig::default()).unwrap();
        let capped = detect_entries(&block_square(), &nodes, &ways, &ceiling).unwrap();
        assert_eq!(full.start_node_count, 2);
        assert_eq!(full.raw_candidate_count, 2);
        assert_eq!(capped.raw_candidate_count, 1);
    }

    #[test]
    fn search_radius_limits_expansion() {
        let (nodes, ways) = dog_leg();
        let config = DetectionConfig { search_radius_m: Some(5.0), ..DetectionConfig::default() };
        let report = detect_entries(&block_square(), &nodes, &ways, &config).unwrap();
        assert_eq!(report.raw_candidate_count, 1);
        assert_eq!(report.candidates[0].start_node, NodeId(2));
    }

    #[test]
    fn both_traversals_find_the_same_start_nodes() {
        for seed in [1, 2, 3] {
            let (nodes, ways) = lattice(seed);
            let bfs = DetectionConfig { traversal: Traversal::BreadthFirst, ..DetectionConfig::default() };
            let best = DetectionConfig { traversal: Traversal::BestFirst, ..DetectionConfig::default() };

            let a = detect_entries(&centred_square(), &nodes, &ways, &bfs).unwrap();
            let b = detect_entries(&centred_square(), &nodes, &ways, &best).unwrap();
            assert_eq!(a.raw_candidate_count, b.raw_candidate_count, "seed {seed}");
            assert_eq!(a.start_node_count, b.start_node_count);
        }
    }
}

// ── Scoring ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod score {
    use pa_core::ScoringPolicy;

    use crate::score::{confidence, continuity, distance_score, length_bonus};

    #[test]
    fn distance_score_saturates_at_cap() {
        assert_eq!(distance_score(0.0, 200.0), 0.0);
        assert!((distance_score(100.0, 200.0) - 0.5).abs() < 1e-12);
        assert_eq!(distance_score(200.0, 200.0), 1.0);
        assert_eq!(distance_score(5_000.0, 200.0), 1.0);
    }

    #[test]
    fn length_bonus_grows_past_cap() {
        let p = ScoringPolicy::default();
        assert_eq!(length_bonus(150.0, &p), 0.0);
        assert!((length_bonus(300.0, &p) - 0.05).abs() < 1e-12);
        assert!((length_bonus(400.0, &p) - 0.1).abs() < 1e-12);
        assert!((length_bonus(10_000.0, &p) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn continuity_caps_degree() {
        assert!((continuity([1, 2, 4, 8], 4) - 0.6875).abs() < 1e-12);
        assert_eq!(continuity([], 4), 0.0);
        assert_eq!(continuity([9, 9], 4), 1.0);
    }

    #[test]
    fn confidence_is_clamped() {
        let heavy = ScoringPolicy { base_blend: 5.0, ..ScoringPolicy::default() };
        assert_eq!(confidence(1.0, 1.0, &heavy), 1.0);
        assert_eq!(confidence(0.0, 0.0, &ScoringPolicy::default()), 0.0);

        let p = ScoringPolicy::default();
        assert!((confidence(0.5, 0.5, &p) - 0.5).abs() < 1e-12);
    }
}

// ── Clustering and ranking ────────────────────────────────────────────────────

#[cfg(test)]
mod cluster {
    use pa_core::{CandidateId, GeoPoint};

    use crate::candidate::rank;
    use crate::cluster::{cluster, cluster_key};
    use super::helpers::candidate;

    #[test]
    fn key_rounds_to_cells() {
        // 100 m cells are ~0.000898°.
        assert_eq!(cluster_key(GeoPoint::new(0.0, 0.0), 100.0), (0, 0));
        assert_eq!(cluster_key(GeoPoint::new(0.0003, 0.0003), 100.0), (0, 0));
        assert_eq!(cluster_key(GeoPoint::new(0.0009, -0.0009), 100.0), (-1, 1));
    }

    #[test]
    fn highest_confidence_wins_bucket() {
        let out = cluster(
            vec![
                candidate(0, 0.0001, 0.0001, 0.4),
                candidate(1, 0.0002, 0.0001, 0.7),
                candidate(2, 0.0001, 0.0002, 0.5),
            ],
            100.0,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, CandidateId(1));
    }

    #[test]
    fn tie_goes_to_lower_id() {
        let out = cluster(
            vec![candidate(5, 0.0001, 0.0001, 0.6), candidate(2, 0.0002, 0.0002, 0.6)],
            100.0,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, CandidateId(2));
    }

    #[test]
    fn distant_hits_are_kept() {
        let out = cluster(
            vec![candidate(0, 0.0, 0.0, 0.6), candidate(1, 0.01, 0.0, 0.3)],
            100.0,
        );
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn rank_orders_by_confidence_then_id() {
        let mut cs = vec![
            candidate(3, 0.0, 0.0, 0.2),
            candidate(1, 0.0, 0.0, 0.8),
            candidate(0, 0.0, 0.0, 0.2),
            candidate(2, 0.0, 0.0, 0.9),
        ];
        rank(&mut cs);
        let ids: Vec<u32> = cs.iter().map(|c| c.id.get()).collect();
        assert_eq!(ids, vec![2, 1, 0, 3]);
    }
}

// ── Properties over random lattices ───────────────────────────────────────────

#[cfg(test)]
mod properties {
    use pa_core::DetectionConfig;
    use pa_network::{Node, RoadGraph, Way};

    use crate::{detect_entries, detect_on_graph};
    use super::helpers::{centred_square, deep_slot, deg, lattice, slotted_square};

    const SEEDS: [u64; 4] = [11, 23, 37, 41];

    #[test]
    fn scores_are_bounded_and_sorted() {
        for seed in SEEDS {
            let (nodes, ways) = lattice(seed);
            let report = detect_entries(&centred_square(), &nodes, &ways, &DetectionConfig::default()).unwrap();
            assert!(!report.candidates.is_empty(), "seed {seed}");

            for c in &report.candidates {
                for (name, v) in [
                    ("confidence", c.confidence),
                    ("straightness", c.straightness),
                    ("continuity", c.continuity),
                    ("distance_score", c.distance_score),
                    ("road_class_score", c.road_class_score),
                ] {
                    assert!((0.0..=1.0).contains(&v), "seed {seed}: {name} = {v}");
                }
                assert!(c.distance_m > 0.0);
            }
            assert!(report
                .candidates
                .windows(2)
                .all(|w| w[0].confidence >= w[1].confidence));
        }
    }

    #[test]
    fn paths_are_connected_and_end_on_the_boundary() {
        for seed in SEEDS {
            let (nodes, ways) = lattice(seed);
            let graph = RoadGraph::build(&nodes, &ways);
            let report = detect_on_graph(&graph, &centred_square(), &DetectionConfig::default()).unwrap();

            for c in &report.candidates {
                assert_eq!(c.path_node_ids[0], c.start_node);
                for w in c.path_node_ids.windows(2) {
                    assert!(graph.are_adjacent(w[0], w[1]), "seed {seed}: {} / {}", w[0], w[1]);
                }
                let mut ids = c.path_node_ids.clone();
                ids.sort_unstable();
                ids.dedup();
                assert_eq!(ids.len(), c.path_node_ids.len(), "path repeats a node");

                let p = c.intersection_point;
                let on_vertical = (p.lon.abs() - 0.0005).abs() < 1e-9 && p.lat.abs() <= 0.0005 + 1e-9;
                let on_horizontal = (p.lat.abs() - 0.0005).abs() < 1e-9 && p.lon.abs() <= 0.0005 + 1e-9;
                assert!(on_vertical || on_horizontal, "seed {seed}: {p} is off the boundary");
                assert_eq!(c.path_geometry.last(), Some(&p));
                assert_eq!(c.path_geometry.len(), c.path_node_ids.len() + 1);
            }
        }
    }

    #[test]
    fn identical_inputs_give_identical_results() {
        for seed in SEEDS {
            let (nodes, ways) = lattice(seed);
            let config = DetectionConfig::default();
            let a = detect_entries(&centred_square(), &nodes, &ways, &config).unwrap();
            let b = detect_entries(&centred_square(), &nodes, &ways, &config).unwrap();
            assert_eq!(a.candidates, b.candidates);
            assert_eq!(a.stats, b.stats);
            assert_eq!(a.raw_candidate_count, b.raw_candidate_count);
        }
    }

    #[test]
    fn wider_buffer_never_loses_candidates() {
        for seed in SEEDS {
            let (nodes, ways) = lattice(seed);
            let graph = RoadGraph::build(&nodes, &ways);
            for ring in [centred_square(), slotted_square()] {
                let mut last_raw = 0;
                let mut last_starts = 0;
                for b in [2.0, 5.0, 10.0, 20.0, 40.0, 80.0] {
                    let r = detect_on_graph(&graph, &ring, &DetectionConfig::with_buffer(b)).unwrap();
                    assert!(r.start_node_count >= last_starts, "seed {seed}, buffer {b}");
                    assert!(r.raw_candidate_count >= last_raw, "seed {seed}, buffer {b}");
                    last_raw = r.raw_candidate_count;
                    last_starts = r.start_node_count;
                }
                assert!(last_raw > 0);
            }
        }
    }

    #[test]
    fn node_deep_in_a_slot_stays_a_start_node() {
        // 2 m from the slot's west wall, road runs into the west arm.
        let nodes = vec![Node::new(1, deg(92.0), deg(120.0)), Node::new(2, deg(80.0), deg(120.0))];
        let ways = vec![Way::new(1, [1, 2]).tag("highway", "service")];
        let graph = RoadGraph::build(&nodes, &ways);

        for b in [3.0, 11.0, 30.0, 60.0] {
            let r = detect_on_graph(&graph, &deep_slot(), &DetectionConfig::with_buffer(b)).unwrap();
            assert_eq!(r.start_node_count, 1, "buffer {b}");
            assert_eq!(r.raw_candidate_count, 1, "buffer {b}");
            assert_eq!(r.candidates.len(), 1, "buffer {b}");
            assert!((r.candidates[0].intersection_point.lon - deg(90.0)).abs() < 1e-9);
        }
    }
}

// ── Worker ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod worker {
    use std::sync::Arc;
    use std::time::Duration;

    use pa_core::{DetectionConfig, PaError};
    use pa_network::GraphCache;

    use crate::{DetectError, DetectionRequest, DetectionWorker, EntryDetector};
    use super::helpers::{block_square, lattice, centred_square, twin_roads};

    const WAIT: Duration = Duration::from_secs(30);

    fn request(ring: Vec<pa_core::GeoPoint>, nodes: Vec<pa_network::Node>, ways: Vec<pa_network::Way>) -> DetectionRequest {
        DetectionRequest {
            polygon: ring.iter().map(|p| [p.lon, p.lat]).collect(),
            nodes,
            ways,
            cache_key: None,
            config: None,
        }
    }

    #[test]
    fn worker_matches_inline_result() {
        let (nodes, ways) = lattice(5);
        let req = request(centred_square(), nodes, ways);
        let detector = EntryDetector::default();

        let inline = detector.detect(&req).unwrap();
        let worker = DetectionWorker::spawn(detector);
        assert!(worker.is_threaded());
        let threaded = worker.submit(&req, WAIT).unwrap();

        assert_eq!(threaded.candidates, inline.candidates);
        assert_eq!(threaded.stats, inline.stats);
        assert_eq!(threaded.start_node_count, inline.start_node_count);
    }

    #[test]
    fn zero_timeout_fails() {
        let (nodes, ways) = twin_roads();
        let worker = DetectionWorker::spawn(EntryDetector::default());
        let err = worker.submit(&request(block_square(), nodes, ways), Duration::ZERO).unwrap_err();
        assert!(matches!(err, DetectError::Timeout(_)));
    }

    #[test]
    fn missed_deadline_then_detach() {
        let (nodes, ways) = lattice(3);
        let worker = DetectionWorker::spawn(EntryDetector::default());
        let err = worker
            .submit(&request(centred_square(), nodes, ways), Duration::from_nanos(1))
            .unwrap_err();
        assert!(matches!(err, DetectError::Timeout(_)));

        let t = std::time::Instant::now();
        worker.detach();
        assert!(t.elapsed() < WAIT);
    }

    #[test]
    fn worker_reports_invalid_geometry() {
        let (nodes, ways) = twin_roads();
        let mut req = request(block_square(), nodes, ways);
        req.polygon.truncate(2);

        let worker = DetectionWorker::spawn(EntryDetector::default());
        let err = worker.submit(&req, WAIT).unwrap_err();
        assert!(matches!(err, DetectError::Core(PaError::InvalidGeometry(_))), "{err}");
    }

    #[test]
    fn request_config_overrides_detector() {
        let (nodes, ways) = twin_roads();
        let mut req = request(block_square(), nodes, ways);
        req.config = Some(DetectionConfig { cluster_cell_m: 1.0, ..DetectionConfig::default() });

        let worker = DetectionWorker::spawn(EntryDetector::default());
        let report = worker.submit(&req, WAIT).unwrap();
        assert_eq!(report.candidates.len(), 2);
    }

    #[test]
    fn synchronous_worker_runs_inline() {
        let (nodes, ways) = twin_roads();
        let req = request(block_square(), nodes, ways);
        let worker = DetectionWorker::synchronous(EntryDetector::default());
        assert!(!worker.is_threaded());

        let report = worker.submit(&req, WAIT).unwrap();
        assert_eq!(report.candidates.len(), 1);
    }

    #[test]
    fn shared_cache_serves_repeat_requests() {
        let (nodes, ways) = twin_roads();
        let mut req = request(block_square(), nodes, ways);
        req.cache_key = Some("site-a".into());

        let cache = Arc::new(GraphCache::new());
        let worker = DetectionWorker::spawn(EntryDetector::default().with_cache(Arc::clone(&cache)));

        let first = worker.submit(&req, WAIT).unwrap();
        let second = worker.submit(&req, WAIT).unwrap();
        assert_eq!(first.candidates, second.candidates);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.misses(), 1);
        assert_eq!(cache.hits(), 1);
    }

    #[test]
    fn request_json_uses_defaults() {
        let json = r#"{
            "polygon": [[0.0, 0.0], [0.001, 0.0], [0.001, 0.001], [0.0, 0.001]],
            "nodes": [{"id": 1, "lon": -0.0002, "lat": 0.0005}, {"id": 2, "lon": 0.0002, "lat": 0.0005}],
            "ways": [{"id": 9, "node_ids": [1, 2], "tags": {"highway": "primary"}}],
            "config": {"outer_buffer_m": 40}
        }"#;
        let req: DetectionRequest = serde_json::from_str(json).unwrap();
        let config = req.config.clone().unwrap();
        assert_eq!(config.outer_buffer_m, 40.0);
        assert_eq!(config.max_visited_nodes, DetectionConfig::default().max_visited_nodes);

        let report = EntryDetector::default().detect(&req).unwrap();
        assert_eq!(report.candidates.len(), 1);
    }
}

// ── CSV export ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod export {
    use pa_core::DetectionConfig;

    use crate::{CandidateCsvWriter, detect_entries, write_candidates_csv};
    use super::helpers::{centred_square, lattice};

    #[test]
    fn file_has_header_and_one_row_per_candidate() {
        let (nodes, ways) = lattice(3);
        let report = detect_entries(&centred_square(), &nodes, &ways, &DetectionConfig::default()).unwrap();
        assert!(!report.candidates.is_empty());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("candidates.csv");
        write_candidates_csv(&path, &report.candidates).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[0], "rank");
        assert_eq!(&headers[1], "candidate_id");

        let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(rows.len(), report.candidates.len());
        assert_eq!(&rows[0][0], "1");
        assert_eq!(rows[0][1], report.candidates[0].id.get().to_string());
        assert_eq!(rows[0][2], report.candidates[0].start_node.get().to_string());
    }

    #[test]
    fn in_memory_writer_joins_lists() {
        let c = super::helpers::candidate(4, 0.0005, 0.0001, 0.75);
        let mut w = CandidateCsvWriter::from_writer(Vec::new()).unwrap();
        w.write_candidates(&[c]).unwrap();
        let text = String::from_utf8(w.finish().unwrap()).unwrap();

        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("rank,candidate_id"));
        let row = lines.next().unwrap();
        assert!(row.starts_with("1,4,1,0.7500,"));
        assert!(row.contains(",1;2,"));
        assert!(row.ends_with(",0"));
    }
}
