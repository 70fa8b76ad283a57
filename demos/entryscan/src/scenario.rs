//! Built-in demo site used when no request file is given.
//!
//! A 200 m walled compound with a ring road around it and four approach
//! roads of different classes.  Two of the approaches arrive a few metres
//! apart on the north side and end up in one cluster.
//!
//! ```text
//!                 N1  N2
//!                 │   │
//!        ┌────────┼───┼────────┐  ← ring road, 40 m out
//!        │   ┌────┴───┴────┐   │
//!   W ───┼───┤   compound  ├───┼─── E
//!        │   └──────┬──────┘   │
//!        └──────────┼──────────┘
//!                   S (track)
//! ```
//!
//! Roads are given as plain polylines, the way a GeoJSON source delivers
//! them, and converted to nodes and ways with shared vertices.

use pa_core::{GeoPoint, IdSequence};
use pa_detect::DetectionRequest;
use pa_network::convert::{RoadLine, from_polylines};

/// Compound corner near Mobile, Alabama.
const ORIGIN_LON: f64 = -88.0431;
const ORIGIN_LAT: f64 = 30.6954;

const SIDE_M:  f64 = 200.0;
const RING_M:  f64 = 40.0;
/// Gate aprons sit inside the default 30 m search buffer.
const APRON_M: f64 = 15.0;
const REACH_M: f64 = 400.0;

/// Point `(east_m, north_m)` metres from the compound's south-west corner.
fn at(east_m: f64, north_m: f64) -> GeoPoint {
    let m_lat = pa_core::geo::METRES_PER_DEGREE;
    let m_lon = m_lat * ORIGIN_LAT.to_radians().cos();
    GeoPoint::new(ORIGIN_LON + east_m / m_lon, ORIGIN_LAT + north_m / m_lat)
}

pub fn perimeter() -> Vec<[f64; 2]> {
    [(0.0, 0.0), (SIDE_M, 0.0), (SIDE_M, SIDE_M), (0.0, SIDE_M)]
        .into_iter()
        .map(|(e, n)| {
            let p = at(e, n);
            [p.lon, p.lat]
        })
        .collect()
}

pub fn roads() -> Vec<RoadLine> {
    let lo = -RING_M;
    let hi = SIDE_M + RING_M;
    let mid = SIDE_M / 2.0;

    vec![
        // Ring road, closed on itself, with a vertex wherever an approach meets it.
        RoadLine::new(vec![
            at(lo, lo), at(mid, lo), at(hi, lo), at(hi, mid), at(hi, hi),
            at(mid + 3.0, hi), at(mid - 3.0, hi), at(lo, hi), at(lo, mid), at(lo, lo),
        ])
        .tag("highway", "residential")
        .tag("maxspeed", "20 mph"),
        // West approach: primary road straight in to the gate.
        RoadLine::new(vec![at(-REACH_M, mid), at(lo, mid), at(-APRON_M, mid), at(mid - 60.0, mid)])
            .tag("highway", "primary")
            .tag("surface", "asphalt"),
        // East approach with a kink.
        RoadLine::new(vec![
            at(SIDE_M + REACH_M, mid + 30.0), at(hi, mid), at(SIDE_M + APRON_M, mid), at(mid + 50.0, mid),
        ])
        .tag("highway", "secondary"),
        // Two north approaches six metres apart.
        RoadLine::new(vec![
            at(mid - 3.0, SIDE_M + REACH_M), at(mid - 3.0, hi), at(mid - 3.0, SIDE_M + APRON_M),
            at(mid - 3.0, SIDE_M - 20.0),
        ])
        .tag("highway", "tertiary"),
        RoadLine::new(vec![
            at(mid + 3.0, SIDE_M + REACH_M), at(mid + 3.0, hi), at(mid + 3.0, SIDE_M + APRON_M),
            at(mid + 3.0, SIDE_M - 20.0),
        ])
        .tag("highway", "service"),
        // South farm track.
        RoadLine::new(vec![at(mid, -REACH_M), at(mid, lo), at(mid, -APRON_M), at(mid, 30.0)])
            .tag("highway", "track"),
        // Interior driveway joining the west and east gates.
        RoadLine::new(vec![at(mid - 60.0, mid), at(mid + 50.0, mid)])
            .tag("highway", "service"),
    ]
}

pub fn demo_request() -> DetectionRequest {
    let (nodes, ways) = from_polylines(&roads(), &mut IdSequence::new());
    DetectionRequest {
        polygon: perimeter(),
        nodes,
        ways,
        cache_key: Some("demo-compound".into()),
        config: None,
    }
}
