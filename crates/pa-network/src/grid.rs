//! Uniform-grid spatial index over graph nodes.
//!
//! Node positions are projected into a [`LocalFrame`] centred on the data's
//! bounding box and bucketed into square cells.  The cell edge follows the
//! mean node spacing, `sqrt(bbox_area / node_count)`, clamped to
//! [`MIN_CELL_M`]..[`MAX_CELL_M`]: dense city data lands near 50 m cells,
//! tiny fixtures near sub-metre cells, and neither collapses into a single
//! bucket.
//!
//! Queries return a *superset* of the true hits (whole cells); callers
//! re-check each hit exactly.

use rustc_hash::FxHashMap;

use pa_core::{GeoPoint, LocalFrame};

use crate::graph::NodeIdx;

pub const MIN_CELL_M: f64 = 0.5;
pub const MAX_CELL_M: f64 = 50.0;

/// Below this node count an empty grid answer is double-checked with a
/// linear scan.
pub const LINEAR_FALLBACK_THRESHOLD: usize = 10_000;

type CellKey = (i64, i64);

pub struct SpatialGrid {
    frame:  LocalFrame,
    cell_m: f64,
    cells:  FxHashMap<CellKey, Vec<NodeIdx>>,
    points: Vec<[f64; 2]>,
}

impl SpatialGrid {
    /// Bucket `positions`; entry `i` becomes `NodeIdx(i)`.
    pub fn build(positions: &[GeoPoint]) -> Self {
        if positions.is_empty() {
            return Self {
                frame:  LocalFrame::new(GeoPoint::new(0.0, 0.0)),
                cell_m: MAX_CELL_M,
                cells:  FxHashMap::default(),
                points: Vec::new(),
            };
        }

        let (mut min_lon, mut min_lat) = (f64::INFINITY, f64::INFINITY);
        let (mut max_lon, mut max_lat) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in positions {
            min_lon = min_lon.min(p.lon);
            max_lon = max_lon.max(p.lon);
            min_lat = min_lat.min(p.lat);
            max_lat = max_lat.max(p.lat);
        }
        let frame = LocalFrame::new(GeoPoint::new(
            (min_lon + max_lon) * 0.5,
            (min_lat + max_lat) * 0.5,
        ));

        let points: Vec<[f64; 2]> = positions.iter().map(|&p| frame.project(p)).collect();

        let [x0, y0] = frame.project(GeoPoint::new(min_lon, min_lat));
        let [x1, y1] = frame.project(GeoPoint::new(max_lon, max_lat));
        let area = (x1 - x0).abs() * (y1 - y0).abs();
        let cell_m = if area > 0.0 {
            (area / points.len() as f64).sqrt().clamp(MIN_CELL_M, MAX_CELL_M)
        } else {
            MIN_CELL_M
        };

        let mut cells: FxHashMap<CellKey, Vec<NodeIdx>> = FxHashMap::default();
        for (i, &xy) in points.iter().enumerate() {
            cells.entry(cell_of(xy, cell_m)).or_default().push(NodeIdx(i as u32));
        }

        Self { frame, cell_m, cells, points }
    }

    pub fn cell_size_m(&self) -> f64 {
        self.cell_m
    }

    pub fn bucket_count(&self) -> usize {
        self.cells.len()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Nodes whose cell lies within `radius_m` rings of `center`'s cell,
    /// ascending by index.
    ///
    /// The result may include nodes farther than `radius_m`; it never misses
    /// one that is closer.  A non-finite radius returns every node.
    pub fn within_radius(&self, center: GeoPoint, radius_m: f64) -> Vec<NodeIdx> {
        if self.points.is_empty() || radius_m < 0.0 || radius_m.is_nan() {
            return Vec::new();
        }
        if radius_m.is_infinite() {
            return (0..self.points.len() as u32).map(NodeIdx).collect();
        }

        let c = self.frame.project(center);
        let (cx, cy) = cell_of(c, self.cell_m);
        let r = (radius_m / self.cell_m).ceil() as i64;

        let mut hits = self.collect_cells(
            (cx.saturating_sub(r), cy.saturating_sub(r)),
            (cx.saturating_add(r), cy.saturating_add(r)),
        );
        if hits.is_empty() && self.points.len() < LINEAR_FALLBACK_THRESHOLD {
            let r2 = radius_m * radius_m;
            hits = self.linear_scan(|p| {
                let (dx, dy) = (p[0] - c[0], p[1] - c[1]);
                dx * dx + dy * dy <= r2
            });
        }

        hits.sort_unstable();
        hits
    }

    /// Nodes whose cell overlaps the box from `south_west` to `north_east`,
    /// ascending by index.
    ///
    /// The box is given in degrees, so the answer does not depend on which
    /// frame the caller measured it in.  Like [`within_radius`](Self::within_radius)
    /// the result is a superset.
    pub fn within_bounds(&self, south_west: GeoPoint, north_east: GeoPoint) -> Vec<NodeIdx> {
        if self.points.is_empty() || !(south_west.lon <= north_east.lon && south_west.lat <= north_east.lat) {
            return Vec::new();
        }

        let lo = self.frame.project(south_west);
        let hi = self.frame.project(north_east);
        let mut hits = self.collect_cells(cell_of(lo, self.cell_m), cell_of(hi, self.cell_m));
        if hits.is_empty() && self.points.len() < LINEAR_FALLBACK_THRESHOLD {
            hits = self.linear_scan(|p| (lo[0]..=hi[0]).contains(&p[0]) && (lo[1]..=hi[1]).contains(&p[1]));
        }

        hits.sort_unstable();
        hits
    }

    /// Every node in cells `lo..=hi` on both axes.
    fn collect_cells(&self, lo: CellKey, hi: CellKey) -> Vec<NodeIdx> {
        let window = (hi.0 as f64 - lo.0 as f64 + 1.0) * (hi.1 as f64 - lo.1 as f64 + 1.0);
        let mut hits = Vec::new();
        if window > self.cells.len() as f64 {
            // Fewer occupied buckets than cells in the window: scan buckets.
            for (&(kx, ky), bucket) in &self.cells {
                if (lo.0..=hi.0).contains(&kx) && (lo.1..=hi.1).contains(&ky) {
                    hits.extend_from_slice(bucket);
                }
            }
        } else {
            for kx in lo.0..=hi.0 {
                for ky in lo.1..=hi.1 {
                    if let Some(bucket) = self.cells.get(&(kx, ky)) {
                        hits.extend_from_slice(bucket);
                    }
                }
            }
        }
        hits
    }

    /// Exact planar scan used when the grid answer came back empty.
    fn linear_scan(&self, keep: impl Fn(&[f64; 2]) -> bool) -> Vec<NodeIdx> {
        self.points
            .iter()
            .enumerate()
            .filter(|(_, p)| keep(p))
            .map(|(i, _)| NodeIdx(i as u32))
            .collect()
    }
}

#[inline]
fn cell_of(xy: [f64; 2], cell_m: f64) -> CellKey {
    ((xy[0] / cell_m).floor() as i64, (xy[1] / cell_m).floor() as i64)
}
