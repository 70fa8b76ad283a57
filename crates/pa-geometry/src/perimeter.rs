//! The secured perimeter polygon and its outer buffer.
//!
//! # Coordinates
//!
//! Every operation runs in a [`LocalFrame`] centred on the vertex centroid,
//! so distances are in metres.  The projection is affine, which keeps
//! containment and intersection results identical to the same tests in
//! degrees while making buffer widths meaningful.  The projected ring is a
//! `geo::Polygon`; containment, segment intersection and point-to-edge
//! distance use `geo`'s algorithms on it.
//!
//! # Spatial index
//!
//! Boundary edges are bulk-loaded into an R-tree (via `rstar`) so a crossing
//! test only inspects edges whose bounding boxes overlap the query segment,
//! and a buffer test only measures the nearest edge.

use geo::algorithm::line_intersection::{LineIntersection, line_intersection};
use geo::{
    Area, BoundingRect, Closest, ClosestPoint, Coord, Distance, Euclidean, Intersects, Line,
    LineString, Point, Polygon, Rect,
};
use rstar::{AABB, PointDistance, RTree, RTreeObject};

use pa_core::{GeoPoint, LocalFrame, PaError, PaResult};

// ── R-tree entry ──────────────────────────────────────────────────────────────

#[derive(Clone)]
struct BoundarySegment {
    index: usize,
    line:  Line<f64>,
}

impl RTreeObject for BoundarySegment {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(xy(self.line.start), xy(self.line.end))
    }
}

impl PointDistance for BoundarySegment {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let p = Point::new(point[0], point[1]);
        let nearest = match self.line.closest_point(&p) {
            Closest::Intersection(q) | Closest::SinglePoint(q) => q,
            Closest::Indeterminate => self.line.start_point(),
        };
        let d = Euclidean.distance(p, nearest);
        d * d
    }
}

// ── Crossing ──────────────────────────────────────────────────────────────────

/// Where a segment meets the boundary.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Crossing {
    pub point: GeoPoint,
    /// Boundary edge `ring[edge] → ring[edge + 1]`.
    pub edge: usize,
    /// Position along the query segment, `0` at its start.
    pub t: f64,
}

// ── Perimeter ─────────────────────────────────────────────────────────────────

/// Validated closed ring plus its projection and boundary index.
pub struct Perimeter {
    ring:     Vec<GeoPoint>,
    frame:    LocalFrame,
    polygon:  Polygon<f64>,
    extent:   Rect<f64>,
    segments: RTree<BoundarySegment>,
}

impl Perimeter {
    /// Validate and index a ring of `(lon, lat)` vertices.
    ///
    /// The ring may be given open or closed.  Consecutive duplicate vertices
    /// are collapsed.
    ///
    /// # Errors
    ///
    /// [`PaError::InvalidGeometry`] if a vertex is non-finite or out of the
    /// WGS-84 range, if fewer than three distinct vertices remain, or if the
    /// ring encloses no area.
    pub fn new(ring: &[GeoPoint]) -> PaResult<Self> {
        if let Some((i, p)) = ring.iter().enumerate().find(|(_, p)| !p.is_valid()) {
            return Err(PaError::InvalidGeometry(format!(
                "perimeter vertex {i} has malformed coordinates {p}"
            )));
        }

        let mut vertices: Vec<GeoPoint> = Vec::with_capacity(ring.len());
        for &p in ring {
            if vertices.last() != Some(&p) {
                vertices.push(p);
            }
        }
        if vertices.len() > 1 && vertices.first() == vertices.last() {
            vertices.pop();
        }
        if vertices.len() < 3 {
            return Err(PaError::InvalidGeometry(format!(
                "perimeter needs at least 3 distinct vertices, got {}",
                vertices.len()
            )));
        }

        let n = vertices.len() as f64;
        let centroid = GeoPoint::new(
            vertices.iter().map(|p| p.lon).sum::<f64>() / n,
            vertices.iter().map(|p| p.lat).sum::<f64>() / n,
        );
        let frame = LocalFrame::new(centroid);

        vertices.push(vertices[0]);
        let exterior: Vec<Coord<f64>> = vertices
            .iter()
            .map(|&p| {
                let [x, y] = frame.project(p);
                Coord { x, y }
            })
            .collect();
        let polygon = Polygon::new(LineString::new(exterior), vec![]);

        if polygon.unsigned_area() < 1e-6 {
            return Err(PaError::InvalidGeometry("perimeter encloses no area".into()));
        }
        let extent = polygon
            .bounding_rect()
            .ok_or_else(|| PaError::InvalidGeometry("perimeter has no extent".into()))?;

        let segments = RTree::bulk_load(
            polygon
                .exterior()
                .lines()
                .enumerate()
                .map(|(index, line)| BoundarySegment { index, line })
                .collect(),
        );

        Ok(Self { ring: vertices, frame, polygon, extent, segments })
    }

    /// Closed ring, first vertex repeated at the end.
    pub fn ring(&self) -> &[GeoPoint] {
        &self.ring
    }

    /// Number of boundary edges.
    pub fn edge_count(&self) -> usize {
        self.ring.len() - 1
    }

    /// Mean of the distinct vertices.
    pub fn centroid(&self) -> GeoPoint {
        self.frame.origin()
    }

    pub fn frame(&self) -> &LocalFrame {
        &self.frame
    }

    /// Largest centroid-to-vertex distance, metres.
    pub fn bounding_radius_m(&self) -> f64 {
        let origin = Point::new(0.0, 0.0);
        self.polygon
            .exterior()
            .points()
            .map(|p| Euclidean.distance(origin, p))
            .fold(0.0, f64::max)
    }

    // ── Containment ───────────────────────────────────────────────────────

    /// Point-in-polygon test.  Points on the boundary count as inside.
    pub fn contains(&self, p: GeoPoint) -> bool {
        self.polygon.intersects(&self.point(p))
    }

    /// Planar distance in metres from `p` to the nearest boundary edge.
    pub fn distance_to_boundary_m(&self, p: GeoPoint) -> f64 {
        let q = self.frame.project(p);
        self.segments
            .nearest_neighbor(&q)
            .map_or(f64::INFINITY, |seg| seg.distance_2(&q).sqrt())
    }

    // ── Crossings ─────────────────────────────────────────────────────────

    /// Intersection of segment `a → b` with the boundary nearest to `a`.
    ///
    /// Ties (a vertex shared by two edges) go to the lower edge index.  A
    /// segment lying along an edge meets it at the start of the overlap.
    /// Zero-length segments never cross.
    pub fn first_crossing(&self, a: GeoPoint, b: GeoPoint) -> Option<Crossing> {
        let pa = self.frame.project(a);
        let pb = self.frame.project(b);
        let d = [pb[0] - pa[0], pb[1] - pa[1]];
        let d_len2 = d[0] * d[0] + d[1] * d[1];
        if d_len2 < 1e-18 {
            return None;
        }

        let query = Line::new(Coord { x: pa[0], y: pa[1] }, Coord { x: pb[0], y: pb[1] });
        let param = |c: Coord<f64>| {
            (((c.x - pa[0]) * d[0] + (c.y - pa[1]) * d[1]) / d_len2).clamp(0.0, 1.0)
        };

        let mut best: Option<(f64, usize)> = None;
        for seg in self.segments.locate_in_envelope_intersecting(&AABB::from_corners(pa, pb)) {
            let t = match line_intersection(query, seg.line) {
                None => continue,
                Some(LineIntersection::SinglePoint { intersection, .. }) => param(intersection),
                Some(LineIntersection::Collinear { intersection }) => {
                    param(intersection.start).min(param(intersection.end))
                }
            };
            let better = match best {
                None => true,
                Some((bt, bi)) => t < bt || (t == bt && seg.index < bi),
            };
            if better {
                best = Some((t, seg.index));
            }
        }

        best.map(|(t, edge)| Crossing {
            point: self.frame.unproject([pa[0] + d[0] * t, pa[1] + d[1] * t]),
            edge,
            t,
        })
    }

    // ── Buffer ────────────────────────────────────────────────────────────

    /// The polygon grown outward by `meters`: every point no farther than
    /// `meters` from it.
    ///
    /// # Errors
    ///
    /// [`PaError::Config`] if `meters` is not a positive finite number.
    pub fn outer_buffer(&self, meters: f64) -> PaResult<OuterBuffer<'_>> {
        if !meters.is_finite() || meters <= 0.0 {
            return Err(PaError::Config(format!(
                "buffer width must be a positive number of metres, got {meters}"
            )));
        }
        Ok(OuterBuffer { perimeter: self, width_m: meters })
    }

    fn point(&self, p: GeoPoint) -> Point<f64> {
        let [x, y] = self.frame.project(p);
        Point::new(x, y)
    }
}

// ── OuterBuffer ───────────────────────────────────────────────────────────────

/// A [`Perimeter`] widened by a fixed distance.
///
/// Membership is measured against the boundary rather than an offset ring.
/// A wider buffer always contains a narrower one.
#[derive(Copy, Clone)]
pub struct OuterBuffer<'a> {
    perimeter: &'a Perimeter,
    width_m:   f64,
}

impl OuterBuffer<'_> {
    /// Upper bound on the centroid-to-edge distance, metres.
    pub fn bounding_radius_m(&self) -> f64 {
        self.perimeter.bounding_radius_m() + self.width_m
    }

    /// `true` inside the perimeter or within the buffer width of its boundary.
    pub fn contains(&self, p: GeoPoint) -> bool {
        self.perimeter.contains(p) || self.perimeter.distance_to_boundary_m(p) <= self.width_m
    }

    /// South-west and north-east corners of a box holding the whole buffer.
    pub fn bounds(&self) -> (GeoPoint, GeoPoint) {
        // A millimetre of slack so rounding cannot drop a node on the edge.
        let pad = self.width_m + 1e-3;
        let (min, max) = (self.perimeter.extent.min(), self.perimeter.extent.max());
        let frame = self.perimeter.frame();
        (
            frame.unproject([min.x - pad, min.y - pad]),
            frame.unproject([max.x + pad, max.y + pad]),
        )
    }
}

#[inline]
fn xy(c: Coord<f64>) -> [f64; 2] {
    [c.x, c.y]
}
