//! Path metrics and the confidence blend.
//!
//! ```text
//! distance_score = min(d, cap) / cap
//! length_bonus   = length_bonus_max · min(1, max(0, d − cap) / cap)
//! continuity     = mean over path nodes of min(degree, degree_cap) / degree_cap
//! road_class     = mean over covering ways of RoadClassTable::weight
//! base           = w_d·distance_score + w_s·straightness + w_c·continuity + length_bonus
//! confidence     = clamp(base_blend·base + road_class_blend·road_class, 0, 1)
//! ```
//!
//! Every weight comes from [`ScoringPolicy`].

use pa_core::{GeoPoint, ScoringPolicy, WayId};
use pa_geometry::{path_length_m, straightness};
use pa_network::{NodeIdx, RoadGraph};

/// Every metric computed for one path.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PathScore {
    pub distance_m:       f64,
    pub distance_score:   f64,
    pub straightness:     f64,
    pub continuity:       f64,
    pub road_class_score: f64,
    pub length_bonus:     f64,
    pub confidence:       f64,
}

/// Score `path` on `graph`.  `coords` are the path's node positions and
/// `ways` the distinct ways covering it.
pub fn score_path(
    graph:  &RoadGraph,
    path:   &[NodeIdx],
    coords: &[GeoPoint],
    ways:   &[WayId],
    policy: &ScoringPolicy,
) -> PathScore {
    let distance_m = path_length_m(coords);
    let straight = straightness(coords);
    let cont = continuity(path.iter().map(|&n| graph.degree(n)), policy.degree_cap);

    let table = &policy.road_classes;
    let road_class_score = mean(
        ways.iter()
            .filter_map(|&w| graph.way(w))
            .map(|w| table.weight(&w.tags)),
    )
    .unwrap_or(table.default_weight.clamp(0.0, 1.0));

    let d_score = distance_score(distance_m, policy.distance_cap_m);
    let bonus = length_bonus(distance_m, policy);
    let base = policy.distance_weight * d_score
        + policy.straightness_weight * straight
        + policy.continuity_weight * cont
        + bonus;

    PathScore {
        distance_m,
        distance_score: d_score,
        straightness: straight,
        continuity: cont,
        road_class_score,
        length_bonus: bonus,
        confidence: confidence(base, road_class_score, policy),
    }
}

/// `min(d, cap) / cap`.
#[inline]
pub fn distance_score(distance_m: f64, cap_m: f64) -> f64 {
    (distance_m.max(0.0).min(cap_m) / cap_m).clamp(0.0, 1.0)
}

/// Grows linearly from 0 at the cap to `length_bonus_max` at twice the cap.
#[inline]
pub fn length_bonus(distance_m: f64, policy: &ScoringPolicy) -> f64 {
    let cap = policy.distance_cap_m;
    policy.length_bonus_max * ((distance_m - cap).max(0.0) / cap).min(1.0)
}

/// Mean of `min(degree, cap) / cap`; `0` for an empty path.
pub fn continuity(degrees: impl IntoIterator<Item = usize>, cap: u32) -> f64 {
    let cap = cap.max(1) as f64;
    mean(degrees.into_iter().map(|d| (d as f64).min(cap) / cap)).unwrap_or(0.0)
}

#[inline]
pub fn confidence(base: f64, road_class_score: f64, policy: &ScoringPolicy) -> f64 {
    (policy.base_blend * base + policy.road_class_blend * road_class_score).clamp(0.0, 1.0)
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}
