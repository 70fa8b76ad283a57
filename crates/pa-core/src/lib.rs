//! `pa-core` — foundational types for the perimeter-access entry detector.
//!
//! Every other `pa-*` crate depends on this one.  It has no `pa-*`
//! dependencies and only `serde` and `thiserror` as external ones.
//!
//! # What lives here
//!
//! | Module     | Contents                                                   |
//! |------------|------------------------------------------------------------|
//! | [`ids`]    | `NodeId`, `WayId`, `CandidateId`, `IdSequence`             |
//! | [`geo`]    | `GeoPoint`, haversine distance, `LocalFrame` projection    |
//! | [`tags`]   | `Tags` map, `maxspeed` / `surface` readers                 |
//! | [`config`] | `DetectionConfig`, `ScoringPolicy`, `RoadClassTable`       |
//! | [`error`]  | `PaError`, `PaResult`                                      |

pub mod config;
pub mod error;
pub mod geo;
pub mod ids;
pub mod tags;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::{DetectionConfig, RoadClassTable, ScoringPolicy, Traversal};
pub use error::{PaError, PaResult};
pub use geo::{GeoPoint, LocalFrame};
pub use ids::{CandidateId, IdSequence, NodeId, WayId};
pub use tags::Tags;
