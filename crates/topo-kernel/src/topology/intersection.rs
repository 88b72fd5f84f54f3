//! Finding and classifying the places where two sets of segments meet.
//!
//! Every segment of the source is tested against every segment of the
//! target. Point contacts within tolerance and collinear overlaps are
//! collected per pair of parts, de-duplicated along both curves, merged
//! into maximal linear stretches, and finally classified.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

use crate::error::{check_tolerance, Result};
use crate::geometry::{Curve, Linear, MultiCurve, Point3d, Segment, Vec3};

use super::{normalize_virtual_vertex, path_between, vertex_at, PartMetrics, VERTEX_EPSILON};

/// Classification of one intersection record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntersectionPointType {
    /// The target passes from one side of the source to the other.
    Crossing,
    /// The curves meet in a single point without crossing.
    TouchingInPoint,
    /// First point of a stretch where both run collinearly.
    LinearIntersectionStart,
    /// Last point of such a stretch.
    LinearIntersectionEnd,
    /// A vertex of either input inside a linear stretch.
    LinearIntersectionIntermediate,
    /// A ring's start point in the middle of a linear stretch.
    RingStartEndPseudo,
}

/// A single place where source and target meet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntersectionPoint3D {
    pub point: Point3d,
    pub kind: IntersectionPointType,
    pub source_part: usize,
    /// Segment index plus the factor along that segment.
    pub virtual_source_vertex: f64,
    pub target_part: usize,
    pub virtual_target_vertex: f64,
    /// Set on linear records when the target runs against the source.
    pub opposite_direction: bool,
}

impl IntersectionPoint3D {
    pub fn source_segment(&self) -> usize {
        self.virtual_source_vertex.floor() as usize
    }

    pub fn target_segment(&self) -> usize {
        self.virtual_target_vertex.floor() as usize
    }

    pub fn is_linear(&self) -> bool {
        matches!(
            self.kind,
            IntersectionPointType::LinearIntersectionStart
                | IntersectionPointType::LinearIntersectionEnd
                | IntersectionPointType::LinearIntersectionIntermediate
        )
    }
}

/// Optional records the detector can add to its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DetectorFlags {
    /// Report the source ring's start point where it lies inside a linear
    /// stretch.
    pub source_ring_start_pseudo: bool,
    /// Same for the target ring's start point.
    pub target_ring_start_pseudo: bool,
    /// Report vertices of either input inside linear stretches.
    pub linear_intermediates: bool,
}

impl DetectorFlags {
    pub fn all() -> Self {
        Self {
            source_ring_start_pseudo: true,
            target_ring_start_pseudo: true,
            linear_intermediates: true,
        }
    }
}

/// A maximal stretch where one source part and one target part run
/// collinearly within tolerance. Source positions always increase from
/// `source_from` to `source_to` (wrapping past the start on rings).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearStretch {
    pub source_part: usize,
    pub source_from: f64,
    pub source_to: f64,
    pub target_part: usize,
    pub target_from: f64,
    pub target_to: f64,
    pub opposite_direction: bool,
    pub start: Point3d,
    pub end: Point3d,
    /// The stretch covers the whole source ring.
    pub full_ring: bool,
}

impl LinearStretch {
    /// The stretch as a path along the source part.
    pub fn source_path(&self, source: &impl Linear) -> Vec<Point3d> {
        let part = source.part(self.source_part);
        let mut points = path_between(part, self.source_from, self.source_to);
        let last = points.len() - 1;
        points[0] = self.start;
        points[last] = self.end;
        points
    }

    pub fn length_xy(&self, source: &impl Linear) -> f64 {
        let metrics = PartMetrics::new(source.part(self.source_part));
        if self.full_ring {
            return metrics.total();
        }
        let (a, b) = (metrics.along(self.source_from), metrics.along(self.source_to));
        if b >= a { b - a } else { metrics.total() - a + b }
    }
}

#[derive(Debug, Clone, Copy)]
struct SegmentHit {
    s: f64,
    t: f64,
    location: Point3d,
    on_source_vertex: bool,
    on_target_vertex: bool,
}

#[derive(Debug, Clone, Copy)]
struct SegmentOverlap {
    s_from: f64,
    s_to: f64,
    t_from: f64,
    t_to: f64,
    start: Point3d,
    end: Point3d,
}

#[derive(Debug, Clone, Copy)]
struct RawPoint {
    s_vv: f64,
    t_vv: f64,
    location: Point3d,
    on_source_vertex: bool,
    on_target_vertex: bool,
}

/// All contacts between two segment lists within an XY tolerance.
#[derive(Debug, Clone, Copy)]
pub struct IntersectionDetector {
    tolerance: f64,
    flags: DetectorFlags,
}

impl IntersectionDetector {
    pub fn new(tolerance: f64) -> Result<Self> {
        check_tolerance(tolerance)?;
        Ok(Self {
            tolerance,
            flags: DetectorFlags::default(),
        })
    }

    pub fn with_flags(mut self, flags: DetectorFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Every intersection between `source` and `target`, ordered by source
    /// part and virtual source vertex, ties broken by the target position.
    #[instrument(skip(self, source, target), fields(tolerance = self.tolerance))]
    pub fn find(&self, source: &impl Linear, target: &impl Linear) -> Vec<IntersectionPoint3D> {
        let mut records = Vec::new();
        for i in 0..source.part_count() {
            for j in 0..target.part_count() {
                let (points, _) = self.part_pair(source.part(i), i, target.part(j), j, false);
                records.extend(points);
            }
        }
        sort_records(&mut records);
        debug!(count = records.len(), "intersections found");
        records
    }

    /// Maximal collinear stretches between `source` and `target`.
    pub fn linear_stretches(
        &self,
        source: &impl Linear,
        target: &impl Linear,
    ) -> Vec<LinearStretch> {
        let mut stretches = Vec::new();
        for i in 0..source.part_count() {
            for j in 0..target.part_count() {
                let (_, found) = self.part_pair(source.part(i), i, target.part(j), j, false);
                stretches.extend(found);
            }
        }
        stretches
    }

    /// The collinear stretches as open curves along the source.
    pub fn intersection_lines(&self, source: &impl Linear, target: &impl Linear) -> MultiCurve {
        let mut result = MultiCurve::empty();
        for stretch in self.linear_stretches(source, target) {
            let points = stretch.source_path(source);
            let curve = if stretch.full_ring {
                let mut pts = points;
                pts.pop();
                Curve::ring(pts)
            } else {
                Curve::open(points)
            };
            if let Ok(curve) = curve {
                result.push(curve);
            }
        }
        result
    }

    /// Places where a shape meets itself: two different parts touching, or
    /// one part returning to a location it already passed. Adjacent
    /// segments of a part are not compared. The lower part index is
    /// reported as the source.
    #[instrument(skip(self, shape), fields(tolerance = self.tolerance))]
    pub fn find_self_intersections(&self, shape: &impl Linear) -> Vec<IntersectionPoint3D> {
        let mut records = Vec::new();
        for i in 0..shape.part_count() {
            let part = shape.part(i);
            let metrics = PartMetrics::new(part);
            let (points, _) = self.part_pair(part, i, part, i, true);
            records.extend(points.into_iter().filter(|r| {
                metrics.distance(r.virtual_source_vertex, r.virtual_target_vertex)
                    > 2.0 * self.tolerance
            }));
            for j in i + 1..shape.part_count() {
                let (points, _) = self.part_pair(part, i, shape.part(j), j, false);
                records.extend(points);
            }
        }
        sort_records(&mut records);
        debug!(count = records.len(), "self intersections found");
        records
    }

    /// Records and stretches for one source part against one target part.
    fn part_pair(
        &self,
        source: &Curve,
        source_part: usize,
        target: &Curve,
        target_part: usize,
        same_part: bool,
    ) -> (Vec<IntersectionPoint3D>, Vec<LinearStretch>) {
        let tol = self.tolerance;
        if source.point_count() == 0
            || target.point_count() == 0
            || !source.envelope().intersects(&target.envelope(), tol)
        {
            return (Vec::new(), Vec::new());
        }

        let s_metrics = PartMetrics::new(source);
        let t_metrics = PartMetrics::new(target);
        let s_count = source.segment_count();
        let t_count = target.segment_count();

        let mut raw_points: Vec<RawPoint> = Vec::new();
        let mut pieces: Vec<LinearStretch> = Vec::new();

        for i in 0..s_count {
            let s = source.segment(i);
            let s_env = s.envelope();
            for j in 0..t_count {
                if same_part && !non_adjacent(i, j, s_count, source.is_closed()) {
                    continue;
                }
                let t = target.segment(j);
                if !s_env.intersects(&t.envelope(), tol) {
                    continue;
                }
                let (hits, overlap) = segment_contacts(&s, &t, tol);
                if let Some(o) = overlap {
                    let s_from = normalize_virtual_vertex(i as f64 + o.s_from, source);
                    let s_to = i as f64 + o.s_to;
                    pieces.push(LinearStretch {
                        source_part,
                        source_from: s_from,
                        source_to: s_to,
                        target_part,
                        target_from: j as f64 + o.t_from,
                        target_to: j as f64 + o.t_to,
                        opposite_direction: o.t_to < o.t_from,
                        start: o.start,
                        end: o.end,
                        full_ring: false,
                    });
                }
                for hit in hits {
                    raw_points.push(RawPoint {
                        s_vv: normalize_virtual_vertex(i as f64 + hit.s, source),
                        t_vv: normalize_virtual_vertex(j as f64 + hit.t, target),
                        location: hit.location,
                        on_source_vertex: hit.on_source_vertex,
                        on_target_vertex: hit.on_target_vertex,
                    });
                }
            }
        }

        let stretches = merge_pieces(pieces, source, target, &s_metrics, &t_metrics, tol);
        let points = dedupe_points(raw_points, &s_metrics, &t_metrics, tol);
        trace!(
            source_part,
            target_part,
            points = points.len(),
            stretches = stretches.len(),
            "part pair processed"
        );

        let mut records = Vec::new();
        for p in &points {
            if stretches.iter().any(|st| covers(st, p, &s_metrics, &t_metrics, tol)) {
                continue;
            }
            let kind = classify_contact(source, p.s_vv, target, p.t_vv, &p.location, tol);
            records.push(self.record(
                source,
                source_part,
                p.s_vv,
                target,
                target_part,
                p.t_vv,
                p.location,
                kind,
                false,
            ));
        }

        for st in &stretches {
            records.push(self.record(
                source,
                source_part,
                st.source_from,
                target,
                target_part,
                st.target_from,
                st.start,
                IntersectionPointType::LinearIntersectionStart,
                st.opposite_direction,
            ));
            records.push(self.record(
                source,
                source_part,
                normalize_virtual_vertex(st.source_to, source),
                target,
                target_part,
                normalize_virtual_vertex(st.target_to, target),
                st.end,
                IntersectionPointType::LinearIntersectionEnd,
                st.opposite_direction,
            ));
            if self.flags.linear_intermediates {
                self.push_intermediates(&mut records, st, source, target, &s_metrics, &t_metrics);
            }
            self.push_pseudo_points(&mut records, st, source, target, &s_metrics, &t_metrics);
        }

        (records, stretches)
    }

    /// Vertices of either input strictly inside a stretch. A source vertex
    /// on the same spot as a target vertex is not reported twice.
    fn push_intermediates(
        &self,
        records: &mut Vec<IntersectionPoint3D>,
        st: &LinearStretch,
        source: &Curve,
        target: &Curve,
        s_metrics: &PartMetrics,
        t_metrics: &PartMetrics,
    ) {
        let tol = self.tolerance;
        let (lo, hi) = target_range(st);
        let mut found: Vec<IntersectionPoint3D> = Vec::new();
        for k in 0..target.point_count() {
            let vv = k as f64;
            if !strictly_within(t_metrics, lo, hi, vv, st.full_ring, tol) {
                continue;
            }
            let p = target.point(k);
            found.push(self.record(
                source,
                st.source_part,
                locate_on_curve(source, &p),
                target,
                st.target_part,
                vv,
                p,
                IntersectionPointType::LinearIntersectionIntermediate,
                st.opposite_direction,
            ));
        }
        for k in 0..source.point_count() {
            let vv = k as f64;
            if !strictly_within(s_metrics, st.source_from, st.source_to, vv, st.full_ring, tol) {
                continue;
            }
            let p = source.point(k);
            if found.iter().any(|r| r.point.equals_xy(&p, tol)) {
                continue;
            }
            found.push(self.record(
                source,
                st.source_part,
                vv,
                target,
                st.target_part,
                locate_on_curve(target, &p),
                p,
                IntersectionPointType::LinearIntersectionIntermediate,
                st.opposite_direction,
            ));
        }
        records.extend(found);
    }

    fn push_pseudo_points(
        &self,
        records: &mut Vec<IntersectionPoint3D>,
        st: &LinearStretch,
        source: &Curve,
        target: &Curve,
        s_metrics: &PartMetrics,
        t_metrics: &PartMetrics,
    ) {
        let tol = self.tolerance;
        if self.flags.source_ring_start_pseudo && source.is_closed() {
                if strictly_within(s_metrics, st.source_from, st.source_to, 0.0, st.full_ring, tol) {
                let p = source.point(0);
                let t_vv = locate_on_curve(target, &p);
                records.push(self.record(
                    source,
                    st.source_part,
                    0.0,
                    target,
                    st.target_part,
                    t_vv,
                    p,
                    IntersectionPointType::RingStartEndPseudo,
                    st.opposite_direction,
                ));
            }
        }
        if self.flags.target_ring_start_pseudo && target.is_closed() {
            let (lo, hi) = target_range(st);
            if strictly_within(t_metrics, lo, hi, 0.0, st.full_ring, tol) {
                let p = target.point(0);
                let s_vv = locate_on_curve(source, &p);
                records.push(self.record(
                    source,
                    st.source_part,
                    s_vv,
                    target,
                    st.target_part,
                    0.0,
                    p,
                    IntersectionPointType::RingStartEndPseudo,
                    st.opposite_direction,
                ));
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn record(
        &self,
        source: &Curve,
        source_part: usize,
        s_vv: f64,
        target: &Curve,
        target_part: usize,
        t_vv: f64,
        location: Point3d,
        kind: IntersectionPointType,
        opposite_direction: bool,
    ) -> IntersectionPoint3D {
        let target_z = target.virtual_point(t_vv).z;
        let z = if !target_z.is_nan() {
            target_z
        } else {
            source.virtual_point(s_vv).z
        };
        IntersectionPoint3D {
            point: location.with_z(z),
            kind,
            source_part,
            virtual_source_vertex: s_vv,
            target_part,
            virtual_target_vertex: t_vv,
            opposite_direction,
        }
    }
}

fn sort_records(records: &mut [IntersectionPoint3D]) {
    records.sort_by(|a, b| {
        a.source_part
            .cmp(&b.source_part)
            .then(a.virtual_source_vertex.total_cmp(&b.virtual_source_vertex))
            .then(a.target_part.cmp(&b.target_part))
            .then(a.virtual_target_vertex.total_cmp(&b.virtual_target_vertex))
    });
}

/// Segments `i` and `j` of one part neither coincide nor share a vertex.
fn non_adjacent(i: usize, j: usize, count: usize, closed: bool) -> bool {
    if j <= i + 1 {
        return false;
    }
    !(closed && i == 0 && j == count - 1)
}

/// Point contacts and the collinear overlap (if any) of two segments.
fn segment_contacts(s: &Segment, t: &Segment, tol: f64) -> (Vec<SegmentHit>, Option<SegmentOverlap>) {
    let (ls, lt) = (s.length_xy(), t.length_xy());

    if ls > tol && lt > tol {
        let near = |seg: &Segment, p: &Point3d| seg.signed_line_distance(p).abs() <= tol;
        if near(s, &t.start) && near(s, &t.end) && near(t, &s.start) && near(t, &s.end) {
            if let Some(overlap) = collinear_overlap(s, t, tol) {
                return (Vec::new(), Some(overlap));
            }
        }
    }

    let mut hits: Vec<SegmentHit> = Vec::new();
    let mut push = |hit: SegmentHit| {
        if !hits.iter().any(|h| h.location.equals_xy(&hit.location, tol)) {
            hits.push(hit);
        }
    };

    // Target vertices first: their locations win over nearby source vertices.
    for (t_factor, p) in [(0.0, t.start), (1.0, t.end)] {
        if s.distance_xy(&p) <= tol {
            let (s_factor, on_source_vertex) = if p.equals_xy(&s.start, tol) {
                (0.0, true)
            } else if p.equals_xy(&s.end, tol) {
                (1.0, true)
            } else {
                (s.closest_factor(&p), false)
            };
            push(SegmentHit {
                s: s_factor,
                t: t_factor,
                location: p,
                on_source_vertex,
                on_target_vertex: true,
            });
        }
    }
    for (s_factor, p) in [(0.0, s.start), (1.0, s.end)] {
        if t.distance_xy(&p) <= tol {
            push(SegmentHit {
                s: s_factor,
                t: t.closest_factor(&p),
                location: p,
                on_source_vertex: true,
                on_target_vertex: false,
            });
        }
    }

    if hits.is_empty() {
        let (ds, dt) = (s.direction(), t.direction());
        let denom = ds.cross_xy(&dt);
        if denom.abs() > f64::EPSILON * ls * lt {
            let w = t.start - s.start;
            let a = w.cross_xy(&dt) / denom;
            let b = w.cross_xy(&ds) / denom;
            if (0.0..=1.0).contains(&a) && (0.0..=1.0).contains(&b) {
                let mut location = s.point_at(a);
                let tz = t.point_at(b).z;
                if !tz.is_nan() {
                    location.z = tz;
                }
                hits.push(SegmentHit {
                    s: a,
                    t: b,
                    location,
                    on_source_vertex: false,
                    on_target_vertex: false,
                });
            }
        }
    }

    (hits, None)
}

/// Overlap of two collinear segments if it is longer than `tol`. The
/// overlap runs in the source direction; each end sits on a target vertex
/// when the target ends inside the source segment.
fn collinear_overlap(s: &Segment, t: &Segment, tol: f64) -> Option<SegmentOverlap> {
    let ls = s.length_xy();
    let f0 = s.project_factor(&t.start);
    let f1 = s.project_factor(&t.end);
    let lo = f0.min(f1).max(0.0);
    let hi = f0.max(f1).min(1.0);
    if (hi - lo) * ls <= tol {
        return None;
    }

    // Target vertex at the low end, if it falls inside the source segment.
    let low_end = |factor: f64, t_factor: f64, vertex: Point3d| (factor, t_factor, vertex);
    let (s_from, t_from, start) = if f0.min(f1) > 0.0 {
        if f0 <= f1 {
            low_end(f0, 0.0, t.start)
        } else {
            low_end(f1, 1.0, t.end)
        }
    } else {
        (0.0, t.closest_factor(&s.start), s.start)
    };
    let (s_to, t_to, end) = if f0.max(f1) < 1.0 {
        if f0 >= f1 {
            (f0, 0.0, t.start)
        } else {
            (f1, 1.0, t.end)
        }
    } else {
        (1.0, t.closest_factor(&s.end), s.end)
    };

    Some(SegmentOverlap {
        s_from: s_from.clamp(0.0, 1.0),
        s_to: s_to.clamp(0.0, 1.0),
        t_from,
        t_to,
        start,
        end,
    })
}

/// Join overlaps that continue each other on both curves into maximal
/// stretches.
fn merge_pieces(
    mut pieces: Vec<LinearStretch>,
    source: &Curve,
    target: &Curve,
    s_metrics: &PartMetrics,
    t_metrics: &PartMetrics,
    tol: f64,
) -> Vec<LinearStretch> {
    pieces.sort_by(|a, b| a.source_from.total_cmp(&b.source_from));

    let continues = |a: &LinearStretch, b: &LinearStretch| {
        a.opposite_direction == b.opposite_direction
            && s_metrics.distance(a.source_to, b.source_from) <= tol
            && t_metrics.distance(a.target_to, b.target_from) <= tol
            && a.end.equals_xy(&b.start, tol)
    };

    loop {
        let mut merged = false;
        'outer: for i in 0..pieces.len() {
            for j in 0..pieces.len() {
                if i != j && continues(&pieces[i], &pieces[j]) {
                    let next = pieces.remove(j);
                    let i = if j < i { i - 1 } else { i };
                    let piece = &mut pieces[i];
                    piece.source_to = next.source_to;
                    piece.target_to = next.target_to;
                    piece.end = next.end;
                    merged = true;
                    break 'outer;
                }
            }
        }
        if !merged {
            break;
        }
    }

    for piece in &mut pieces {
        if source.is_closed()
            && target.is_closed()
            && continues(piece, piece)
            && (s_metrics.total() - tol) <= span_along(piece, s_metrics)
        {
            piece.full_ring = true;
            piece.source_to = piece.source_from;
            piece.target_to = piece.target_from;
            piece.end = piece.start;
        }
        piece.target_from = normalize_virtual_vertex(piece.target_from, target);
    }
    pieces
}

fn span_along(piece: &LinearStretch, metrics: &PartMetrics) -> f64 {
    let (a, b) = (metrics.along(piece.source_from), metrics.along(piece.source_to));
    if b > a { b - a } else { metrics.total() - a + b }
}

/// The stretch's target range as a forward interval on the target.
fn target_range(st: &LinearStretch) -> (f64, f64) {
    if st.opposite_direction {
        (st.target_to, st.target_from)
    } else {
        (st.target_from, st.target_to)
    }
}

/// `x` lies inside the range and more than `tol` from both of its ends.
fn strictly_within(metrics: &PartMetrics, from: f64, to: f64, x: f64, full: bool, tol: f64) -> bool {
    (full || metrics.in_range(from, to, x, -tol))
        && metrics.distance(x, from) > tol
        && metrics.distance(x, to) > tol
}

fn covers(
    st: &LinearStretch,
    p: &RawPoint,
    s_metrics: &PartMetrics,
    t_metrics: &PartMetrics,
    slack: f64,
) -> bool {
    let tol_s = slack.max(VERTEX_EPSILON * s_metrics.total());
    let tol_t = slack.max(VERTEX_EPSILON * t_metrics.total());
    let (lo, hi) = target_range(st);
    (st.full_ring || s_metrics.in_range(st.source_from, st.source_to, p.s_vv, tol_s))
        && t_metrics.in_range(lo, hi, p.t_vv, tol_t)
}

/// Collapse hits reported by neighbouring segment pairs at the same place.
/// A hit on a target vertex is preferred as representative, then one on a
/// source vertex.
fn dedupe_points(
    raw: Vec<RawPoint>,
    s_metrics: &PartMetrics,
    t_metrics: &PartMetrics,
    tol: f64,
) -> Vec<RawPoint> {
    let mut groups: Vec<Vec<RawPoint>> = Vec::new();
    for p in raw {
        let existing = groups.iter_mut().find(|g| {
            g.iter().any(|q| {
                s_metrics.distance(p.s_vv, q.s_vv) <= tol
                    && t_metrics.distance(p.t_vv, q.t_vv) <= tol
                    && p.location.equals_xy(&q.location, 2.0 * tol)
            })
        });
        match existing {
            Some(g) => g.push(p),
            None => groups.push(vec![p]),
        }
    }
    let rank = |p: &RawPoint| (p.on_target_vertex as u8) * 2 + p.on_source_vertex as u8;
    groups
        .into_iter()
        .filter_map(|g| {
            let best = g.iter().map(rank).max()?;
            g.into_iter().find(|p| rank(p) == best)
        })
        .collect()
}

/// Virtual vertex of the location on `curve` closest to `point`.
pub(crate) fn locate_on_curve(curve: &Curve, point: &Point3d) -> f64 {
    let mut best = (f64::INFINITY, 0.0);
    for (i, seg) in curve.segments().enumerate() {
        let f = seg.closest_factor(point);
        let d = seg.point_at(f).distance_xy(point);
        if d < best.0 {
            best = (d, i as f64 + f);
        }
    }
    normalize_virtual_vertex(best.1, curve)
}

/// Direction from `at` towards the first vertex, walking backwards from
/// `index`, that is farther than `tol` away. `None` past the start of an
/// open curve.
fn ray_backward(curve: &Curve, index: Option<usize>, at: &Point3d, tol: f64) -> Option<Vec3> {
    let n = curve.point_count();
    let mut idx = index?;
    for _ in 0..n {
        let p = curve.point(idx);
        if !p.equals_xy(at, tol) {
            return Some(p - *at);
        }
        idx = match (idx, curve.is_closed()) {
            (0, true) => n - 1,
            (0, false) => return None,
            (k, _) => k - 1,
        };
    }
    None
}

fn ray_forward(curve: &Curve, index: Option<usize>, at: &Point3d, tol: f64) -> Option<Vec3> {
    let n = curve.point_count();
    let mut idx = index?;
    for _ in 0..n {
        let p = curve.point(idx);
        if !p.equals_xy(at, tol) {
            return Some(p - *at);
        }
        idx += 1;
        if idx == n {
            if curve.is_closed() {
                idx = 0;
            } else {
                return None;
            }
        }
    }
    None
}

/// Incoming and outgoing rays of a curve at a virtual vertex, both
/// pointing away from the location.
pub(crate) fn rays_at(
    curve: &Curve,
    virtual_vertex: f64,
    at: &Point3d,
    tol: f64,
) -> (Option<Vec3>, Option<Vec3>) {
    let n = curve.point_count();
    let prev_of = |k: usize| -> Option<usize> {
        match (k, curve.is_closed()) {
            (0, true) => Some(n - 1),
            (0, false) => None,
            (k, _) => Some(k - 1),
        }
    };
    let next_of = |k: usize| -> Option<usize> {
        if k + 1 < n {
            Some(k + 1)
        } else if curve.is_closed() {
            Some(0)
        } else {
            None
        }
    };
    match vertex_at(virtual_vertex, curve) {
        Some(k) => (
            ray_backward(curve, prev_of(k), at, tol),
            ray_forward(curve, next_of(k), at, tol),
        ),
        None => {
            let k = virtual_vertex.floor() as usize;
            (
                ray_backward(curve, Some(k), at, tol),
                ray_forward(curve, next_of(k), at, tol),
            )
        }
    }
}

/// Crossing if the target's two rays lie on different sides of the
/// source's two rays; touching otherwise, or when any ray is missing.
fn classify_contact(
    source: &Curve,
    s_vv: f64,
    target: &Curve,
    t_vv: f64,
    at: &Point3d,
    tol: f64,
) -> IntersectionPointType {
    let (s_in, s_out) = rays_at(source, s_vv, at, tol);
    let (t_in, t_out) = rays_at(target, t_vv, at, tol);
    let (Some(s_in), Some(s_out), Some(t_in), Some(t_out)) = (s_in, s_out, t_in, t_out) else {
        return IntersectionPointType::TouchingInPoint;
    };

    let base = s_out.angle_xy();
    let ccw = |v: &Vec3| (v.angle_xy() - base).rem_euclid(TAU);
    let span = ccw(&s_in);
    let angular_tol = 1e-9;
    let side = |v: &Vec3| {
        let a = ccw(v);
        if a < angular_tol || a > TAU - angular_tol || (a - span).abs() < angular_tol {
            None
        } else {
            Some(a < span)
        }
    };
    match (side(&t_in), side(&t_out)) {
        (Some(a), Some(b)) if a != b => IntersectionPointType::Crossing,
        _ => IntersectionPointType::TouchingInPoint,
    }
}
