//! `pa-detect` — entry-candidate detection.
//!
//! # Crate layout
//!
//! | Module        | Contents                                                    |
//! |---------------|-------------------------------------------------------------|
//! | [`search`]    | start-node discovery, bounded per-start-node traversal      |
//! | [`score`]     | path metrics and the confidence blend                       |
//! | [`cluster`]   | grid deduplication of nearby boundary hits                  |
//! | [`detect`]    | the pipeline, `detect_entries`, `EntryDetector`, request and report types |
//! | [`worker`]    | `DetectionWorker`: background thread with inline fallback   |
//! | [`export`]    | CSV export                                                  |
//!
//! # Features
//!
//! | Feature    | Effect                                                       |
//! |------------|--------------------------------------------------------------|
//! | `parallel` | start-node searches run on the Rayon pool                    |

pub mod candidate;
pub mod cluster;
pub mod detect;
pub mod error;
pub mod export;
pub mod score;
pub mod search;
pub mod worker;

#[cfg(test)]
mod tests;

pub use candidate::EntryCandidate;
pub use detect::{DetectionReport, DetectionRequest, EntryDetector, detect_entries, detect_on_graph};
pub use error::{DetectError, DetectResult};
pub use export::{CandidateCsvWriter, write_candidates_csv};
pub use worker::{DetectionWorker, WorkerReply};
