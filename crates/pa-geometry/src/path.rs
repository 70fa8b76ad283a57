//! Metrics over a path's coordinate sequence.

use std::f64::consts::PI;

use pa_core::{GeoPoint, LocalFrame};

/// Sum of haversine leg lengths, metres.
pub fn path_length_m(coords: &[GeoPoint]) -> f64 {
    coords.windows(2).map(|w| w[0].distance_m(w[1])).sum()
}

/// How close the path is to a straight line, in `[0, 1]`.
///
/// `1 − Σ|π − θᵢ| / (π · (n − 2))` over the interior vertices, where `θᵢ` is
/// the angle between the incoming and outgoing legs (`π` when the path runs
/// straight through).  Paths with fewer than three coordinates are straight
/// by definition.  Vertices with a zero-length leg contribute no deviation.
pub fn straightness(coords: &[GeoPoint]) -> f64 {
    if coords.len() < 3 {
        return 1.0;
    }
    let frame = LocalFrame::new(coords[0]);
    let pts: Vec<[f64; 2]> = coords.iter().map(|&p| frame.project(p)).collect();

    let deviation: f64 = pts
        .windows(3)
        .map(|w| {
            let back = [w[0][0] - w[1][0], w[0][1] - w[1][1]];
            let fwd  = [w[2][0] - w[1][0], w[2][1] - w[1][1]];
            let (lb, lf) = (back[0].hypot(back[1]), fwd[0].hypot(fwd[1]));
            if lb < 1e-9 || lf < 1e-9 {
                return 0.0;
            }
            let cos = ((back[0] * fwd[0] + back[1] * fwd[1]) / (lb * lf)).clamp(-1.0, 1.0);
            (PI - cos.acos()).abs()
        })
        .sum();

    let interior = (coords.len() - 2) as f64;
    (1.0 - deviation / (PI * interior)).clamp(0.0, 1.0)
}
