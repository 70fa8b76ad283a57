//! `pa-network` — road graph, spatial index, and build cache.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                    |
//! |-------------|-------------------------------------------------------------|
//! | [`graph`]   | `Node`, `Way`, `RoadGraph` (CSR adjacency), `RoadGraphBuilder` |
//! | [`grid`]    | `SpatialGrid`, a density-adaptive uniform grid            |
//! | [`cache`]   | `Fingerprint`, `GraphCache` (concurrent, content-keyed)     |
//! | [`convert`] | `RoadLine`, `from_polylines`                                |

pub mod cache;
pub mod convert;
pub mod graph;
pub mod grid;


pub use cache::{Fingerprint, GraphCache};
pub use graph::{EdgeKey, GraphStats, Node, NodeIdx, RoadGraph, RoadGraphBuilder, Way, ways_along};
pub use grid::SpatialGrid;
