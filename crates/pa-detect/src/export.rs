//! CSV export of ranked candidates.
//!
//! One row per candidate, in the order given (normally rank order).  List
//! columns join their items with `;`.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use csv::Writer;

use crate::{DetectError, DetectResult, EntryCandidate};

const HEADER: [&str; 15] = [
    "rank",
    "candidate_id",
    "start_node",
    "confidence",
    "distance_m",
    "distance_score",
    "straightness",
    "continuity",
    "road_class_score",
    "intersection_lon",
    "intersection_lat",
    "path_node_count",
    "path_node_ids",
    "way_ids",
    "manual",
];

/// Writes candidate rows to any `io::Write`.
pub struct CandidateCsvWriter<W: Write> {
    inner: Writer<W>,
    rows:  usize,
}

impl CandidateCsvWriter<File> {
    /// Create (or truncate) the file at `path` and write the header row.
    pub fn create(path: &Path) -> DetectResult<Self> {
        Self::with_writer(Writer::from_path(path)?)
    }
}

impl<W: Write> CandidateCsvWriter<W> {
    pub fn from_writer(w: W) -> DetectResult<Self> {
        Self::with_writer(Writer::from_writer(w))
    }

    fn with_writer(mut inner: Writer<W>) -> DetectResult<Self> {
        inner.write_record(HEADER)?;
        Ok(Self { inner, rows: 0 })
    }

    pub fn write_candidates(&mut self, candidates: &[EntryCandidate]) -> DetectResult<()> {
        for c in candidates {
            self.rows += 1;
            self.inner.write_record(&[
                self.rows.to_string(),
                c.id.get().to_string(),
                c.start_node.get().to_string(),
                format!("{:.4}", c.confidence),
                format!("{:.2}", c.distance_m),
                format!("{:.4}", c.distance_score),
                format!("{:.4}", c.straightness),
                format!("{:.4}", c.continuity),
                format!("{:.4}", c.road_class_score),
                format!("{:.7}", c.intersection_point.lon),
                format!("{:.7}", c.intersection_point.lat),
                c.path_node_ids.len().to_string(),
                join(c.path_node_ids.iter().map(|n| n.get())),
                join(c.way_ids.iter().map(|w| w.get())),
                (c.manual as u8).to_string(),
            ])?;
        }
        Ok(())
    }

    /// Flush and hand back the underlying writer.
    pub fn finish(self) -> DetectResult<W> {
        self.inner
            .into_inner()
            .map_err(|e| DetectError::Io(e.into_error()))
    }
}

/// Write `candidates` to a new CSV file at `path`.
pub fn write_candidates_csv(path: &Path, candidates: &[EntryCandidate]) -> DetectResult<()> {
    let mut w = CandidateCsvWriter::create(path)?;
    w.write_candidates(candidates)?;
    w.finish()?;
    Ok(())
}

fn join<T: ToString>(items: impl Iterator<Item = T>) -> String {
    items.map(|i| i.to_string()).collect::<Vec<_>>().join(";")
}
