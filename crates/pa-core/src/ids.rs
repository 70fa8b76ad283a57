//! Strongly typed identifier wrappers and the id sequence used when road data
//! has to be synthesized.
//!
//! Node and way ids follow the OSM convention of signed 64-bit integers, so
//! they are *not* dense indices.  Graph code keeps its own dense `u32` indices
//! internally and maps ids through a hash map.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Generate a typed ID wrapper around a primitive integer.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty);) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[derive(Serialize, Deserialize)]
        #[serde(transparent)]
        $vis struct $name(pub $inner);

        impl $name {
            /// Sentinel meaning "no valid ID".
            pub const INVALID: $name = $name(<$inner>::MAX);

            #[inline(always)]
            pub fn get(self) -> $inner {
                self.0
            }
        }

        impl Default for $name {
            /// Returns the `INVALID` sentinel so uninitialized IDs are visibly invalid.
            #[inline(always)]
            fn default() -> Self {
                Self::INVALID
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl From<$inner> for $name {
            #[inline(always)]
            fn from(raw: $inner) -> $name {
                $name(raw)
            }
        }
    };
}

typed_id! {
    /// Identity of a road node.  Shared by every way touching that location.
    pub struct NodeId(i64);
}

typed_id! {
    /// Identity of a way (an ordered run of nodes).
    pub struct WayId(i64);
}

typed_id! {
    /// Identity of an entry candidate within one detection result.
    ///
    /// Assigned in ascending start-node order, so it doubles as the
    /// deterministic tie-breaker during clustering and ranking.
    pub struct CandidateId(u32);
}

// ── IdSequence ────────────────────────────────────────────────────────────────

/// Explicit counter for synthesizing node and way ids.
///
/// Each conversion owns its own sequence, so two conversions running at the
/// same time never interleave ids and a rerun with a fresh sequence yields the
/// same ids.  Synthesized ids count *down* from `-1`, the OSM convention for
/// elements that do not exist upstream, so they never collide with real ids.
#[derive(Clone, Debug)]
pub struct IdSequence {
    next_node: i64,
    next_way:  i64,
}

impl IdSequence {
    /// A sequence whose first node and way ids are both `-1`.
    pub fn new() -> Self {
        Self::starting_at(-1)
    }

    /// A sequence whose first node and way ids are both `first`.
    ///
    /// Useful when merging synthesized data into a set that already used some
    /// negative ids.
    pub fn starting_at(first: i64) -> Self {
        Self { next_node: first, next_way: first }
    }

    pub fn next_node(&mut self) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node -= 1;
        id
    }

    pub fn next_way(&mut self) -> WayId {
        let id = WayId(self.next_way);
        self.next_way -= 1;
        id
    }
}

impl Default for IdSequence {
    fn default() -> Self {
        Self::new()
    }
}
