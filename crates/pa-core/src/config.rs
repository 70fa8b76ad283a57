//! Detection configuration.
//!
//! Every tunable of the pipeline lives here rather than in code constants.
//! The confidence blend in particular is an empirical policy: the defaults
//! only encode "distance, geometry and road class all matter", not a
//! derived model.
//!
//! All structs deserialize with `#[serde(default)]`, so a JSON file only has
//! to name the fields it changes.  Call [`DetectionConfig::validate`] before
//! use.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::tags::{self, Tags};
use crate::{PaError, PaResult};

/// Upper bound accepted for `outer_buffer_m`.
pub const MAX_OUTER_BUFFER_M: f64 = 1_000.0;

// ── DetectionConfig ───────────────────────────────────────────────────────────

/// Traversal order used by the per-start-node search.
///
/// Both orders find a candidate for the same start nodes whenever the visit
/// ceiling is not reached; best-first usually reaches the boundary after
/// expanding fewer nodes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Traversal {
    BreadthFirst,
    /// Expand the node closest to the perimeter centroid first.
    #[default]
    BestFirst,
}

/// Top-level configuration for one detection call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Width of the search annulus outside the perimeter, metres.
    /// Must be in `(0, 1000]`.  Default: 30.
    pub outer_buffer_m: f64,

    /// Maximum nodes expanded per start node before giving up.
    pub max_visited_nodes: usize,

    /// If set, nodes farther than this (metres) from the start node are not
    /// expanded.
    pub search_radius_m: Option<f64>,

    pub traversal: Traversal,

    /// Edge length of the clustering grid, metres.  Default: 100.
    pub cluster_cell_m: f64,

    pub scoring: ScoringPolicy,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            outer_buffer_m:    30.0,
            max_visited_nodes: 5_000,
            search_radius_m:   None,
            traversal:         Traversal::default(),
            cluster_cell_m:    100.0,
            scoring:           ScoringPolicy::default(),
        }
    }
}

impl DetectionConfig {
    /// Default configuration with a different buffer width.
    pub fn with_buffer(outer_buffer_m: f64) -> Self {
        Self { outer_buffer_m, ..Self::default() }
    }

    pub fn validate(&self) -> PaResult<()> {
        let b = self.outer_buffer_m;
        if !b.is_finite() || b <= 0.0 || b > MAX_OUTER_BUFFER_M {
            return Err(PaError::Config(format!(
                "outer_buffer_m must be in (0, {MAX_OUTER_BUFFER_M}], got {b}"
            )));
        }
        if self.max_visited_nodes == 0 {
            return Err(PaError::Config("max_visited_nodes must be at least 1".into()));
        }
        if let Some(r) = self.search_radius_m {
            if !r.is_finite() || r <= 0.0 {
                return Err(PaError::Config(format!(
                    "search_radius_m must be positive, got {r}"
                )));
            }
        }
        if !self.cluster_cell_m.is_finite() || self.cluster_cell_m <= 0.0 {
            return Err(PaError::Config(format!(
                "cluster_cell_m must be positive, got {}",
                self.cluster_cell_m
            )));
        }
        self.scoring.validate()
    }
}

// ── ScoringPolicy ─────────────────────────────────────────────────────────────

/// Weights of the confidence blend.
///
/// ```text
/// base       = w_d·distance_score + w_s·straightness + w_c·continuity + length_bonus
/// confidence = clamp(base_blend·base + road_class_blend·road_class_score, 0, 1)
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    pub distance_weight:     f64,
    pub straightness_weight: f64,
    pub continuity_weight:   f64,

    /// Path length at which `distance_score` saturates at 1, metres.
    pub distance_cap_m: f64,

    /// Largest bonus for paths longer than `distance_cap_m`.  The bonus grows
    /// linearly from 0 at the cap to this value at twice the cap.
    pub length_bonus_max: f64,

    /// Node degrees above this count as this when scoring continuity.
    pub degree_cap: u32,

    pub base_blend:       f64,
    pub road_class_blend: f64,

    pub road_classes: RoadClassTable,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            distance_weight:     0.4,
            straightness_weight: 0.3,
            continuity_weight:   0.3,
            distance_cap_m:      200.0,
            length_bonus_max:    0.1,
            degree_cap:          4,
            base_blend:          0.7,
            road_class_blend:    0.3,
            road_classes:        RoadClassTable::default(),
        }
    }
}

impl ScoringPolicy {
    pub fn validate(&self) -> PaResult<()> {
        let weights = [
            ("distance_weight", self.distance_weight),
            ("straightness_weight", self.straightness_weight),
            ("continuity_weight", self.continuity_weight),
            ("length_bonus_max", self.length_bonus_max),
            ("base_blend", self.base_blend),
            ("road_class_blend", self.road_class_blend),
        ];
        for (name, w) in weights {
            if !w.is_finite() || w < 0.0 {
                return Err(PaError::Config(format!(
                    "{name} must be a non-negative number, got {w}"
                )));
            }
        }
        if !self.distance_cap_m.is_finite() || self.distance_cap_m <= 0.0 {
            return Err(PaError::Config(format!(
                "distance_cap_m must be positive, got {}",
                self.distance_cap_m
            )));
        }
        if self.degree_cap == 0 {
            return Err(PaError::Config("degree_cap must be at least 1".into()));
        }
        self.road_classes.validate()
    }
}

// ── RoadClassTable ────────────────────────────────────────────────────────────

/// Per-`highway` weights plus small bonuses for traffic-calmed and paved
/// ways.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoadClassTable {
    /// `highway` value → weight in `[0, 1]`.
    pub classes: BTreeMap<String, f64>,

    /// Weight for untagged ways and unknown classes.
    pub default_weight: f64,

    /// Added when `maxspeed` is at or below `low_speed_limit_kmh`.
    pub low_speed_bonus:     f64,
    pub low_speed_limit_kmh: f64,

    /// Added for sealed `surface` values (asphalt, concrete, …).
    pub paved_bonus: f64,
}

impl Default for RoadClassTable {
    fn default() -> Self {
        let classes = [
            ("motorway", 1.0),
            ("motorway_link", 1.0),
            ("trunk", 1.0),
            ("trunk_link", 1.0),
            ("primary", 0.9),
            ("primary_link", 0.9),
            ("secondary", 0.8),
            ("secondary_link", 0.8),
            ("tertiary", 0.7),
            ("tertiary_link", 0.7),
            ("unclassified", 0.6),
            ("residential", 0.6),
            ("service", 0.5),
            ("living_street", 0.4),
            ("track", 0.3),
            ("cycleway", 0.25),
            ("path", 0.25),
            ("bridleway", 0.25),
            ("footway", 0.2),
            ("pedestrian", 0.2),
            ("steps", 0.2),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v))
        .collect();

        Self {
            classes,
            default_weight:      0.5,
            low_speed_bonus:     0.05,
            low_speed_limit_kmh: 30.0,
            paved_bonus:         0.05,
        }
    }
}

impl RoadClassTable {
    /// Weight of one way, clamped to `[0, 1]`.
    pub fn weight(&self, tags: &Tags) -> f64 {
        let mut w = tags::highway(tags)
            .and_then(|class| self.classes.get(class).copied())
            .unwrap_or(self.default_weight);

        if tags::maxspeed_kmh(tags).is_some_and(|v| v <= self.low_speed_limit_kmh) {
            w += self.low_speed_bonus;
        }
        if tags::is_paved(tags) {
            w += self.paved_bonus;
        }
        w.clamp(0.0, 1.0)
    }

    fn validate(&self) -> PaResult<()> {
        let bad = self
            .classes
            .iter()
            .map(|(k, v)| (k.as_str(), *v))
            .chain([
                ("default_weight", self.default_weight),
                ("low_speed_bonus", self.low_speed_bonus),
                ("paved_bonus", self.paved_bonus),
            ])
            .find(|(_, v)| !v.is_finite() || *v < 0.0);

        match bad {
            Some((name, v)) => Err(PaError::Config(format!(
                "road class weight {name:?} must be a non-negative number, got {v}"
            ))),
            None => Ok(()),
        }
    }
}
