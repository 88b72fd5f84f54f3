use serde::{Deserialize, Serialize};
use std::cell::OnceCell;

use crate::error::{Result, TopologyError};

use super::envelope::Envelope;
use super::point::Point3d;
use super::segment::Segment;

/// Winding of a ring as seen from above (+Z).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    Clockwise,
    CounterClockwise,
    /// Open curves, and rings whose XY projection has no area (e.g. a
    /// vertical facet).
    Undefined,
}

/// Where a point lies relative to a ring or an area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointLocation {
    Inside,
    Outside,
    OnBoundary,
}

#[derive(Debug, Clone)]
struct CurveProperties {
    signed_area: f64,
    envelope: Envelope,
    canonical_start: usize,
    orientation: Orientation,
}

/// An ordered sequence of vertices, optionally closed into a ring.
///
/// A closed curve never stores its closing point: segment `n - 1` runs from
/// the last vertex back to the first. The curve owns its point buffer
/// exclusively; every mutator below works in place and drops the cached
/// derived properties.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "CurveRepr")]
pub struct Curve {
    points: Vec<Point3d>,
    closed: bool,
    #[serde(skip)]
    cache: OnceCell<CurveProperties>,
}

/// Wire form of a [`Curve`]; deserialized curves pass through the
/// constructors.
#[derive(Deserialize)]
struct CurveRepr {
    points: Vec<Point3d>,
    closed: bool,
}

impl TryFrom<CurveRepr> for Curve {
    type Error = TopologyError;

    fn try_from(repr: CurveRepr) -> Result<Self> {
        if repr.closed {
            Self::ring(repr.points)
        } else {
            Self::open(repr.points)
        }
    }
}

impl PartialEq for Curve {
    fn eq(&self, other: &Self) -> bool {
        self.closed == other.closed && self.points == other.points
    }
}

impl Curve {
    /// An open path through at least two points.
    pub fn open(points: Vec<Point3d>) -> Result<Self> {
        if points.len() < 2 {
            return Err(TopologyError::TooFewPoints {
                required: 2,
                actual: points.len(),
            });
        }
        Ok(Self {
            points,
            closed: false,
            cache: OnceCell::new(),
        })
    }

    /// A closed ring. A trailing point equal to the first one is dropped.
    pub fn ring(points: Vec<Point3d>) -> Result<Self> {
        Self::ring_with_tolerance(points, 0.0)
    }

    /// Like [`Curve::ring`], treating a last point within `tolerance` of the
    /// first as the closing point.
    ///
    /// Vertices sharing an XY position but at different heights are distinct,
    /// so vertical rings are accepted; their orientation is
    /// [`Orientation::Undefined`].
    pub fn ring_with_tolerance(mut points: Vec<Point3d>, tolerance: f64) -> Result<Self> {
        if points.len() > 1 {
            let (first, last) = (points[0], points[points.len() - 1]);
            if same_vertex(&first, &last, tolerance) {
                points.pop();
            }
        }
        let distinct = count_distinct(&points, tolerance);
        if distinct < 3 {
            return Err(TopologyError::TooFewPoints {
                required: 3,
                actual: distinct,
            });
        }
        Ok(Self {
            points,
            closed: true,
            cache: OnceCell::new(),
        })
    }

    /// Convenience constructor from raw XY pairs (Z undefined).
    pub fn ring_xy(coords: &[(f64, f64)]) -> Result<Self> {
        Self::ring(coords.iter().map(|&(x, y)| Point3d::xy(x, y)).collect())
    }

    pub fn open_xy(coords: &[(f64, f64)]) -> Result<Self> {
        Self::open(coords.iter().map(|&(x, y)| Point3d::xy(x, y)).collect())
    }

    /// Chain a list of connected segments into an open curve.
    pub fn from_segments(segments: &[Segment]) -> Result<Self> {
        let Some(first) = segments.first() else {
            return Err(TopologyError::TooFewPoints {
                required: 2,
                actual: 0,
            });
        };
        let mut points = Vec::with_capacity(segments.len() + 1);
        points.push(first.start);
        points.extend(segments.iter().map(|s| s.end));
        Self::open(points)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn points(&self) -> &[Point3d] {
        &self.points
    }

    pub fn into_points(self) -> Vec<Point3d> {
        self.points
    }

    /// Vertex list including the closing point for rings.
    pub fn to_closed_points(&self) -> Vec<Point3d> {
        let mut pts = self.points.clone();
        if self.closed {
            if let Some(&first) = pts.first() {
                pts.push(first);
            }
        }
        pts
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn point(&self, index: usize) -> Point3d {
        self.points[index]
    }

    pub fn segment_count(&self) -> usize {
        match (self.closed, self.points.len()) {
            (_, 0) => 0,
            (true, n) => n,
            (false, n) => n - 1,
        }
    }

    pub fn segment(&self, index: usize) -> Segment {
        let n = self.points.len();
        Segment::new(self.points[index], self.points[(index + 1) % n])
    }

    pub fn segments(&self) -> impl Iterator<Item = Segment> + '_ {
        (0..self.segment_count()).map(move |i| self.segment(i))
    }

    pub fn start_point(&self) -> Point3d {
        self.points[0]
    }

    pub fn end_point(&self) -> Point3d {
        if self.closed {
            self.points[0]
        } else {
            self.points[self.points.len() - 1]
        }
    }

    pub fn length_xy(&self) -> f64 {
        self.segments().map(|s| s.length_xy()).sum()
    }

    pub fn length_3d(&self) -> f64 {
        self.segments().map(|s| s.length_3d()).sum()
    }

    fn properties(&self) -> &CurveProperties {
        self.cache.get_or_init(|| self.compute_properties())
    }

    fn compute_properties(&self) -> CurveProperties {
        let envelope = Envelope::from_points(&self.points);
        let signed_area = if self.closed {
            // Shoelace relative to the first vertex; negated so that clockwise
            // rings come out positive.
            let origin = self.points[0];
            let mut twice = 0.0;
            for i in 1..self.points.len().saturating_sub(1) {
                let a = self.points[i] - origin;
                let b = self.points[i + 1] - origin;
                twice += a.cross_xy(&b);
            }
            -twice / 2.0
        } else {
            0.0
        };

        let mut canonical_start = 0;
        for (i, p) in self.points.iter().enumerate().skip(1) {
            if p.is_right_bottom_of(&self.points[canonical_start]) {
                canonical_start = i;
            }
        }

        let scale = envelope.width().max(envelope.height());
        let orientation = if !self.closed || signed_area.abs() <= scale * scale * 1e-12 {
            Orientation::Undefined
        } else if signed_area > 0.0 {
            Orientation::Clockwise
        } else {
            Orientation::CounterClockwise
        };

        CurveProperties {
            signed_area,
            envelope,
            canonical_start,
            orientation,
        }
    }

    /// Signed XY area: positive for clockwise rings, negative for
    /// counter-clockwise rings, zero for open curves.
    pub fn signed_area_xy(&self) -> f64 {
        self.properties().signed_area
    }

    /// Orientation by the sign of the XY area. Only rings whose area is zero
    /// up to rounding are [`Orientation::Undefined`]; see
    /// [`Curve::orientation_within`] for a tolerance-aware variant.
    pub fn orientation(&self) -> Orientation {
        self.properties().orientation
    }

    /// Like [`Curve::orientation`], but a ring whose XY area does not exceed
    /// `tolerance` times its XY perimeter is [`Orientation::Undefined`]. A
    /// facet leaning less than `tolerance` off the vertical projects to such
    /// a ring.
    pub fn orientation_within(&self, tolerance: f64) -> Orientation {
        if self.closed && self.signed_area_xy().abs() <= tolerance * self.length_xy() {
            Orientation::Undefined
        } else {
            self.orientation()
        }
    }

    pub fn envelope(&self) -> Envelope {
        self.properties().envelope
    }

    /// Index of the right-most, then bottom-most vertex. Two rings with the
    /// same vertices but different start points share the same canonical
    /// start vertex.
    pub fn canonical_start_index(&self) -> usize {
        self.properties().canonical_start
    }

    /// True if the ring has no XY area worth considering at `tolerance`: its
    /// area is smaller than a `tolerance`-wide strip along half its boundary.
    pub fn is_degenerate_ring(&self, tolerance: f64) -> bool {
        !self.closed
            || self.orientation() == Orientation::Undefined
            || self.signed_area_xy().abs() <= tolerance * self.length_xy() / 4.0
    }

    /// Point at a virtual vertex: segment index plus the fraction along it.
    pub fn virtual_point(&self, virtual_vertex: f64) -> Point3d {
        let count = self.segment_count();
        if count == 0 {
            return self.points[0];
        }
        let clamped = virtual_vertex.clamp(0.0, count as f64);
        let index = (clamped.floor() as usize).min(count - 1);
        self.segment(index).point_at(clamped - index as f64)
    }

    /// Cumulative XY distance from the start to a virtual vertex.
    pub fn distance_along(&self, virtual_vertex: f64) -> f64 {
        let count = self.segment_count();
        let clamped = virtual_vertex.clamp(0.0, count as f64);
        let index = (clamped.floor() as usize).min(count.saturating_sub(1));
        let mut dist: f64 = (0..index).map(|i| self.segment(i).length_xy()).sum();
        if count > 0 {
            dist += self.segment(index).length_xy() * (clamped - index as f64);
        }
        dist
    }

    /// Locate `point` relative to this ring (ignoring orientation).
    pub fn locate_point_xy(&self, point: &Point3d, tolerance: f64) -> PointLocation {
        if self.segments().any(|s| s.is_point_on(point, tolerance)) {
            return PointLocation::OnBoundary;
        }
        if !self.closed || !self.envelope().contains_point(point, 0.0) {
            return PointLocation::Outside;
        }
        if crossing_parity(&self.points, point) {
            PointLocation::Inside
        } else {
            PointLocation::Outside
        }
    }

    /// Smallest XY distance from `point` to any segment.
    pub fn distance_xy(&self, point: &Point3d) -> f64 {
        self.segments()
            .map(|s| s.distance_xy(point))
            .fold(f64::INFINITY, f64::min)
    }

    /// Rotation-invariant comparison of two curves in XY. Rings match when
    /// they have the same vertices in the same cyclic order.
    pub fn equals_xy(&self, other: &Self, tolerance: f64) -> bool {
        if self.closed != other.closed || self.points.len() != other.points.len() {
            return false;
        }
        let n = self.points.len();
        if !self.closed {
            return self
                .points
                .iter()
                .zip(&other.points)
                .all(|(a, b)| a.equals_xy(b, tolerance));
        }
        let start = self.canonical_start_index();
        let anchor = self.points[start];
        (0..n)
            .filter(|&j| other.points[j].equals_xy(&anchor, tolerance))
            .any(|j| {
                (0..n).all(|k| {
                    self.points[(start + k) % n].equals_xy(&other.points[(j + k) % n], tolerance)
                })
            })
    }

    // ── Mutators (in place) ─────────────────────────────────────────────

    fn invalidate(&mut self) {
        self.cache = OnceCell::new();
    }

    pub fn set_point(&mut self, index: usize, point: Point3d) {
        self.points[index] = point;
        self.invalidate();
    }

    /// Close the curve into a ring. A last point equal to the first is
    /// absorbed as the closing point.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        let mut points = std::mem::take(&mut self.points);
        if points.len() > 1 && same_vertex(&points[0], &points[points.len() - 1], 0.0) {
            points.pop();
        }
        let distinct = count_distinct(&points, 0.0);
        if distinct < 3 {
            self.points = points;
            return Err(TopologyError::TooFewPoints {
                required: 3,
                actual: distinct,
            });
        }
        self.points = points;
        self.closed = true;
        self.invalidate();
        Ok(())
    }

    /// Re-open a ring. The stored vertex sequence is returned unchanged,
    /// without the implicit closing point.
    pub fn open_ring(&mut self) {
        self.closed = false;
        self.invalidate();
    }

    pub fn reverse(&mut self) {
        if self.closed {
            // Keep the same start vertex.
            self.points[1..].reverse();
        } else {
            self.points.reverse();
        }
        self.invalidate();
    }

    pub fn reversed(&self) -> Self {
        let mut c = self.clone();
        c.reverse();
        c
    }

    /// Rotate a ring so that vertex `index` becomes the start.
    pub fn rotate_start(&mut self, index: usize) {
        if self.closed && index > 0 && index < self.points.len() {
            self.points.rotate_left(index);
            self.invalidate();
        }
    }

    /// Fill undefined Z values by linear interpolation over the 3D path
    /// distance to the nearest defined neighbours. Vertices with only one
    /// defined neighbour (ends of open curves) copy its Z. Returns false if
    /// no vertex has a Z value.
    pub fn interpolate_undefined_z(&mut self) -> bool {
        let n = self.points.len();
        let defined: Vec<usize> = (0..n).filter(|&i| self.points[i].has_z()).collect();
        if defined.is_empty() {
            return false;
        }
        if defined.len() == n {
            return true;
        }

        let mut result = self.points.clone();
        for i in 0..n {
            if self.points[i].has_z() {
                continue;
            }
            let prev = self.find_defined(i, false);
            let next = self.find_defined(i, true);
            let z = match (prev, next) {
                (Some((pi, dp)), Some((ni, dn))) if pi != ni && dp + dn > 0.0 => {
                    let zp = self.points[pi].z;
                    let zn = self.points[ni].z;
                    zp + (zn - zp) * dp / (dp + dn)
                }
                (Some((pi, _)), _) => self.points[pi].z,
                (None, Some((ni, _))) => self.points[ni].z,
                (None, None) => continue,
            };
            result[i].z = z;
        }
        self.points = result;
        self.invalidate();
        true
    }

    /// Walk from `from` to the nearest vertex with a defined Z, returning its
    /// index and the path distance travelled.
    fn find_defined(&self, from: usize, forward: bool) -> Option<(usize, f64)> {
        let n = self.points.len();
        let mut dist = 0.0;
        let mut current = from;
        for _ in 0..n {
            let next = if forward {
                if current + 1 == n {
                    if !self.closed {
                        return None;
                    }
                    0
                } else {
                    current + 1
                }
            } else if current == 0 {
                if !self.closed {
                    return None;
                }
                n - 1
            } else {
                current - 1
            };
            dist += self.points[current].distance_3d(&self.points[next]);
            if self.points[next].has_z() {
                return Some((next, dist));
            }
            current = next;
        }
        None
    }

    /// Snap every coordinate to a grid. This may move the canonical start
    /// and flip the orientation of tiny rings, so the cache is rebuilt.
    pub fn snap_to_resolution(&mut self, resolution: f64) {
        if resolution <= 0.0 {
            return;
        }
        for p in &mut self.points {
            *p = p.snap_to_resolution(resolution);
        }
        self.invalidate();
    }

    /// Drop consecutive vertices within `tolerance` of their predecessor.
    /// Returns the number of removed vertices.
    pub fn remove_duplicate_points(&mut self, tolerance: f64) -> usize {
        let before = self.points.len();
        let mut kept: Vec<Point3d> = Vec::with_capacity(before);
        for p in &self.points {
            match kept.last() {
                Some(last) if last.equals_xy(p, tolerance) => {}
                _ => kept.push(*p),
            }
        }
        if self.closed {
            while kept.len() > 1 && kept[kept.len() - 1].equals_xy(&kept[0], tolerance) {
                kept.pop();
            }
        }
        self.points = kept;
        self.invalidate();
        before - self.points.len()
    }
}

/// Even-odd ray casting towards +X.
pub(crate) fn crossing_parity(ring: &[Point3d], p: &Point3d) -> bool {
    let n = ring.len();
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (pi, pj) = (ring[i], ring[j]);
        if (pi.y > p.y) != (pj.y > p.y) {
            let x_cross = (pj.x - pi.x) * (p.y - pi.y) / (pj.y - pi.y) + pi.x;
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Same XY position, and not separated by two defined heights.
fn same_vertex(a: &Point3d, b: &Point3d, tolerance: f64) -> bool {
    a.equals_xy(b, tolerance) && !(a.has_z() && b.has_z() && (a.z - b.z).abs() > tolerance)
}

fn count_distinct(points: &[Point3d], tolerance: f64) -> usize {
    let mut distinct: Vec<&Point3d> = Vec::new();
    for p in points {
        if !distinct.iter().any(|q| same_vertex(q, p, tolerance)) {
            distinct.push(p);
            if distinct.len() >= 3 {
                return distinct.len();
            }
        }
    }
    distinct.len()
}
