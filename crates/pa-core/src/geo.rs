//! Geographic coordinate type and the small-area metric projection.
//!
//! `GeoPoint` stores WGS-84 degrees as `f64`.  Boundary-crossing tests work on
//! sub-metre offsets, which single precision cannot resolve away from the
//! equator.
//!
//! `LocalFrame` is an equirectangular projection about a fixed origin.  It is
//! accurate to well under 1 % for extents of a few kilometres and degrades
//! with distance from the origin; large-area deployments need a proper
//! geodesic library.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Metres per degree of latitude on the mean sphere.
pub const METRES_PER_DEGREE: f64 = EARTH_RADIUS_M * std::f64::consts::PI / 180.0;

/// A WGS-84 geographic coordinate in degrees.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

impl GeoPoint {
    #[inline]
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Haversine great-circle distance in metres.
    pub fn distance_m(self, other: GeoPoint) -> f64 {
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lon = (other.lon - self.lon).to_radians();

        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();

        let a = (d_lat * 0.5).sin().powi(2)
            + lat1.cos() * lat2.cos() * (d_lon * 0.5).sin().powi(2);

        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_M * c
    }

    /// `true` if both components are finite and inside the WGS-84 ranges.
    #[inline]
    pub fn is_valid(self) -> bool {
        self.lon.is_finite()
            && self.lat.is_finite()
            && (-180.0..=180.0).contains(&self.lon)
            && (-90.0..=90.0).contains(&self.lat)
    }

    /// Exact bit pattern of both components, for hashing and exact-match keys.
    #[inline]
    pub fn bits(self) -> (u64, u64) {
        (self.lon.to_bits(), self.lat.to_bits())
    }
}

impl From<[f64; 2]> for GeoPoint {
    /// `[lon, lat]`, the GeoJSON axis order.
    fn from([lon, lat]: [f64; 2]) -> Self {
        Self { lon, lat }
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.7}, {:.7})", self.lon, self.lat)
    }
}

// ── LocalFrame ────────────────────────────────────────────────────────────────

/// Equirectangular projection into planar metres `[x_east, y_north]` about a
/// fixed origin.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LocalFrame {
    origin:         GeoPoint,
    m_per_deg_lon:  f64,
    m_per_deg_lat:  f64,
}

impl LocalFrame {
    pub fn new(origin: GeoPoint) -> Self {
        // Clamp so a polar origin does not collapse the x axis to zero.
        let cos_lat = origin.lat.to_radians().cos().max(1e-6);
        Self {
            origin,
            m_per_deg_lon: METRES_PER_DEGREE * cos_lat,
            m_per_deg_lat: METRES_PER_DEGREE,
        }
    }

    pub fn origin(&self) -> GeoPoint {
        self.origin
    }

    #[inline]
    pub fn project(&self, p: GeoPoint) -> [f64; 2] {
        [
            (p.lon - self.origin.lon) * self.m_per_deg_lon,
            (p.lat - self.origin.lat) * self.m_per_deg_lat,
        ]
    }

    #[inline]
    pub fn unproject(&self, xy: [f64; 2]) -> GeoPoint {
        GeoPoint {
            lon: self.origin.lon + xy[0] / self.m_per_deg_lon,
            lat: self.origin.lat + xy[1] / self.m_per_deg_lat,
        }
    }
}
