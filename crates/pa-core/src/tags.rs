//! Way tag map and the few tag readers the scorer needs.

use std::collections::BTreeMap;

/// Free-form way attributes (`highway`, `surface`, `maxspeed`, `name`, …).
///
/// A `BTreeMap` keeps iteration order stable, which the build-cache
/// fingerprint relies on.
pub type Tags = BTreeMap<String, String>;

const KMH_PER_MPH: f64 = 1.609_344;

/// The `highway=*` road class, if tagged.
pub fn highway(tags: &Tags) -> Option<&str> {
    tags.get("highway").map(|s| s.trim()).filter(|s| !s.is_empty())
}

/// Posted speed limit in km/h.
///
/// Accepts `"30"`, `"30 km/h"`, `"20 mph"`, `"20mph"` and takes the first
/// value of a `;`-separated list.  Symbolic limits (`"RU:urban"`, `"walk"`)
/// yield `None`.
pub fn maxspeed_kmh(tags: &Tags) -> Option<f64> {
    let raw = tags.get("maxspeed")?;
    let first = raw.split(';').next()?.trim();

    let (number, mph) = match first.strip_suffix("mph") {
        Some(rest) => (rest.trim(), true),
        None => (
            first
                .strip_suffix("km/h")
                .or_else(|| first.strip_suffix("kmh"))
                .unwrap_or(first)
                .trim(),
            false,
        ),
    };

    let value: f64 = number.parse().ok()?;
    if !value.is_finite() || value <= 0.0 {
        return None;
    }
    Some(if mph { value * KMH_PER_MPH } else { value })
}

/// `true` for hard, sealed surfaces.
pub fn is_paved(tags: &Tags) -> bool {
    matches!(
        tags.get("surface").map(|s| s.trim()),
        Some("paved" | "asphalt" | "concrete" | "paving_stones" | "concrete:plates")
    )
}
