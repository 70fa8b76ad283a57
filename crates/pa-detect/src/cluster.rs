//! Collapse candidates whose boundary hits are close together.
//!
//! Hits are bucketed on a grid of `cell_m` metres, using one degree =
//! 111 320 m on both axes.  Each bucket keeps its highest-confidence
//! candidate; equal confidence goes to the lower id.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use pa_core::GeoPoint;

use crate::EntryCandidate;

/// Metres per degree used for the clustering grid.
pub const CLUSTER_METRES_PER_DEGREE: f64 = 111_320.0;

/// Grid bucket `(lat_row, lon_col)` of `p`.
pub fn cluster_key(p: GeoPoint, cell_m: f64) -> (i64, i64) {
    let cell_deg = cell_m / CLUSTER_METRES_PER_DEGREE;
    ((p.lat / cell_deg).round() as i64, (p.lon / cell_deg).round() as i64)
}

/// One survivor per bucket, in bucket order.
pub fn cluster(candidates: Vec<EntryCandidate>, cell_m: f64) -> Vec<EntryCandidate> {
    let mut buckets: BTreeMap<(i64, i64), EntryCandidate> = BTreeMap::new();

    for c in candidates {
        match buckets.entry(cluster_key(c.intersection_point, cell_m)) {
            Entry::Vacant(slot) => {
                slot.insert(c);
            }
            Entry::Occupied(mut slot) => {
                let kept = slot.get();
                if c.confidence > kept.confidence
                    || (c.confidence == kept.confidence && c.id < kept.id)
                {
                    slot.insert(c);
                }
            }
        }
    }

    buckets.into_values().collect()
}
