//! `pa-geometry` — polygon and path geometry for entry detection.
//!
//! | Module        | Contents                                                  |
//! |---------------|-----------------------------------------------------------|
//! | [`perimeter`] | `Perimeter`: validation, containment, crossings; `OuterBuffer` |
//! | [`path`]      | `path_length_m`, `straightness`                           |

pub mod path;
pub mod perimeter;


pub use path::{path_length_m, straightness};
pub use perimeter::{Crossing, OuterBuffer, Perimeter};
