//! Splitting two inputs into subcurves between the places where they meet.
//!
//! Intersection locations (and the places where an input touches itself)
//! are clustered into nodes. Every part of both inputs is then cut at each
//! node it passes, and each resulting subcurve is classified against the
//! other input. Where a part passes the same node more than once, the
//! smaller arcs between the visits are boundary loops.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};
use tracing::{debug, instrument, trace};

use crate::error::{check_tolerance, Result};
use crate::geometry::multipoint::cluster_indices;
use crate::geometry::{Curve, Linear, MultiCurve, Point3d, Segment};

use super::intersection::{IntersectionDetector, IntersectionPoint3D};
use super::{normalize_virtual_vertex, path_between, PartMetrics, Region, RegionRule, VERTEX_EPSILON};

new_key_type! {
    pub struct SubcurveId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputSide {
    Source,
    Target,
}

impl InputSide {
    pub fn partner(self) -> Self {
        match self {
            InputSide::Source => InputSide::Target,
            InputSide::Target => InputSide::Source,
        }
    }
}

/// Where a subcurve lies relative to the other input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartnerPosition {
    Inside,
    Outside,
    /// Runs along the partner's boundary in the partner's direction.
    OnBoundarySame,
    /// Runs along the partner's boundary against its direction.
    OnBoundaryOpposite,
}

impl PartnerPosition {
    pub fn is_on_boundary(self) -> bool {
        matches!(self, PartnerPosition::OnBoundarySame | PartnerPosition::OnBoundaryOpposite)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubcurveKind {
    Ordinary,
    /// Part of an arc by which an input returns to a node it already
    /// passed, enclosing less area than the rest of its ring.
    BoundaryLoop,
}

/// A location where subcurves start and end.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub location: Point3d,
    /// The source passes this node more than once.
    pub source_loop: bool,
    /// The target passes this node more than once.
    pub target_loop: bool,
}

impl Node {
    fn new(location: Point3d) -> Self {
        Self {
            location,
            source_loop: false,
            target_loop: false,
        }
    }

    pub fn is_loop_node(&self, side: InputSide) -> bool {
        match side {
            InputSide::Source => self.source_loop,
            InputSide::Target => self.target_loop,
        }
    }
}

/// A stretch of one input part between two consecutive nodes, or a whole
/// ring that meets no node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subcurve {
    pub side: InputSide,
    pub part: usize,
    pub from_node: Option<usize>,
    pub to_node: Option<usize>,
    /// Virtual vertices on the part where the subcurve starts and ends.
    pub from_vertex: f64,
    pub to_vertex: f64,
    /// Vertices from start to end. A node-less ring stores no closing
    /// point.
    pub points: Vec<Point3d>,
    pub position: PartnerPosition,
    pub kind: SubcurveKind,
}

impl Subcurve {
    /// A complete ring that touches nothing.
    pub fn is_closed(&self) -> bool {
        self.from_node.is_none()
    }

    /// Lies in the partner's interior.
    pub fn is_inbound(&self) -> bool {
        self.position == PartnerPosition::Inside
    }

    pub fn is_outbound(&self) -> bool {
        self.position == PartnerPosition::Outside
    }

    pub fn is_boundary_loop(&self) -> bool {
        self.kind == SubcurveKind::BoundaryLoop
    }

    pub fn length_xy(&self) -> f64 {
        let open: f64 = self.points.windows(2).map(|w| w[0].distance_xy(&w[1])).sum();
        match (self.is_closed(), self.points.first(), self.points.last()) {
            (true, Some(first), Some(last)) => open + last.distance_xy(first),
            _ => open,
        }
    }

    pub fn to_curve(&self) -> Result<Curve> {
        if self.is_closed() {
            Curve::ring(self.points.clone())
        } else {
            Curve::open(self.points.clone())
        }
    }
}

/// One pass of a part through a node.
#[derive(Debug, Clone, Copy)]
struct Visit {
    virtual_vertex: f64,
    node: usize,
    gap: f64,
}

/// Both inputs cut into classified subcurves.
#[derive(Debug, Clone)]
pub struct SubcurveNavigator {
    tolerance: f64,
    source: MultiCurve,
    target: MultiCurve,
    intersections: Vec<IntersectionPoint3D>,
    nodes: Vec<Node>,
    subcurves: SlotMap<SubcurveId, Subcurve>,
    source_order: Vec<SubcurveId>,
    target_order: Vec<SubcurveId>,
    source_loops: Vec<Curve>,
    target_loops: Vec<Curve>,
}

impl SubcurveNavigator {
    /// Classify with the even-odd rule: a point is inside the partner when
    /// an odd number of its rings contain it.
    pub fn new(source: &impl Linear, target: &impl Linear, tolerance: f64) -> Result<Self> {
        Self::with_rule(source, target, tolerance, RegionRule::EvenOdd)
    }

    #[instrument(skip(source, target), fields(source_parts = source.part_count(), target_parts = target.part_count()))]
    pub(crate) fn with_rule(
        source: &impl Linear,
        target: &impl Linear,
        tolerance: f64,
        rule: RegionRule,
    ) -> Result<Self> {
        check_tolerance(tolerance)?;
        let source = source.to_multicurve();
        let target = target.to_multicurve();
        let detector = IntersectionDetector::new(tolerance)?;
        let intersections = detector.find(&source, &target);

        // Records come first so that a node takes its location, and
        // with it the target's Z, from a real intersection.
        let mut candidates: Vec<Point3d> = intersections.iter().map(|r| r.point).collect();
        for shape in [&source, &target] {
            candidates.extend(
                detector
                    .find_self_intersections(shape)
                    .iter()
                    .map(|r| r.point),
            );
            for part in shape.parts().iter().filter(|p| !p.is_closed()) {
                candidates.push(part.start_point());
                candidates.push(part.end_point());
            }
        }
        let mut nodes: Vec<Node> = cluster_indices(&candidates, tolerance, None)
            .into_iter()
            .map(|members| Node::new(node_location(&candidates, &members)))
            .collect();

        let source_visits: Vec<Vec<Visit>> = source
            .parts()
            .iter()
            .map(|p| part_visits(p, &nodes, tolerance))
            .collect();
        let target_visits: Vec<Vec<Visit>> = target
            .parts()
            .iter()
            .map(|p| part_visits(p, &nodes, tolerance))
            .collect();
        mark_loop_nodes(&mut nodes, &source_visits, InputSide::Source);
        mark_loop_nodes(&mut nodes, &target_visits, InputSide::Target);

        let mut subcurves = SlotMap::with_key();
        let source_region = Region::new(target.parts(), rule, tolerance);
        let target_region = Region::new(source.parts(), rule, tolerance);
        let (source_order, source_loops) = split_input(
            InputSide::Source,
            &source,
            &source_visits,
            &nodes,
            &PartnerView::new(&target, &source_region),
            tolerance,
            &mut subcurves,
        );
        let (target_order, target_loops) = split_input(
            InputSide::Target,
            &target,
            &target_visits,
            &nodes,
            &PartnerView::new(&source, &target_region),
            tolerance,
            &mut subcurves,
        );

        debug!(
            nodes = nodes.len(),
            subcurves = subcurves.len(),
            source_loops = source_loops.len(),
            target_loops = target_loops.len(),
            "inputs split into subcurves"
        );

        Ok(Self {
            tolerance,
            source,
            target,
            intersections,
            nodes,
            subcurves,
            source_order,
            target_order,
            source_loops,
            target_loops,
        })
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn source(&self) -> &MultiCurve {
        &self.source
    }

    pub fn target(&self) -> &MultiCurve {
        &self.target
    }

    /// The detector's records between source and target.
    pub fn intersections(&self) -> &[IntersectionPoint3D] {
        &self.intersections
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn subcurve(&self, id: SubcurveId) -> Option<&Subcurve> {
        self.subcurves.get(id)
    }

    /// Subcurves of one input in part order, each part from its start.
    pub fn subcurves(&self, side: InputSide) -> impl Iterator<Item = (SubcurveId, &Subcurve)> {
        let order = match side {
            InputSide::Source => &self.source_order,
            InputSide::Target => &self.target_order,
        };
        order
            .iter()
            .filter_map(|&id| self.subcurves.get(id).map(|sc| (id, sc)))
    }

    pub fn source_subcurves(&self) -> impl Iterator<Item = (SubcurveId, &Subcurve)> {
        self.subcurves(InputSide::Source)
    }

    pub fn target_subcurves(&self) -> impl Iterator<Item = (SubcurveId, &Subcurve)> {
        self.subcurves(InputSide::Target)
    }

    /// Arcs by which the source returns to a node it already passed.
    pub fn source_boundary_loops(&self) -> &[Curve] {
        &self.source_loops
    }

    pub fn target_boundary_loops(&self) -> &[Curve] {
        &self.target_loops
    }

    /// Locations where the given input touches itself.
    pub fn loop_node_locations(&self, side: InputSide) -> Vec<Point3d> {
        self.nodes
            .iter()
            .filter(|n| n.is_loop_node(side))
            .map(|n| n.location)
            .collect()
    }
}

/// The other input, as seen by the subcurves being classified.
struct PartnerView<'a> {
    segments: Vec<Segment>,
    region: &'a Region<'a>,
}

impl<'a> PartnerView<'a> {
    fn new(shape: &MultiCurve, region: &'a Region<'a>) -> Self {
        Self {
            segments: shape.parts().iter().flat_map(|p| p.segments()).collect(),
            region,
        }
    }

    fn nearest(&self, point: &Point3d) -> Option<(f64, &Segment)> {
        self.segments
            .iter()
            .map(|s| (s.distance_xy(point), s))
            .min_by(|a, b| a.0.total_cmp(&b.0))
    }
}

fn node_location(candidates: &[Point3d], members: &[usize]) -> Point3d {
    let first = candidates[members[0]];
    if first.has_z() {
        return first;
    }
    members
        .iter()
        .map(|&i| candidates[i])
        .find(|p| p.has_z())
        .map_or(first, |p| first.with_z(p.z))
}

/// Every pass of `part` through a node, in order along the part. A part
/// that lingers near a node for a while passes it once.
fn part_visits(part: &Curve, nodes: &[Node], tolerance: f64) -> Vec<Visit> {
    let metrics = PartMetrics::new(part);
    let envelope = part.envelope();
    let mut visits = Vec::new();

    for (node_index, node) in nodes.iter().enumerate() {
        if !envelope.contains_point(&node.location, tolerance) {
            continue;
        }
        let mut candidates: Vec<Visit> = part
            .segments()
            .enumerate()
            .filter_map(|(i, seg)| {
                let gap = seg.distance_xy(&node.location);
                (gap <= tolerance).then(|| Visit {
                    virtual_vertex: normalize_virtual_vertex(
                        i as f64 + seg.closest_factor(&node.location),
                        part,
                    ),
                    node: node_index,
                    gap,
                })
            })
            .collect();
        candidates.sort_by(|a, b| a.virtual_vertex.total_cmp(&b.virtual_vertex));

        let mut passes: Vec<Visit> = Vec::new();
        for c in candidates {
            match passes.last_mut() {
                Some(last)
                    if metrics.distance(last.virtual_vertex, c.virtual_vertex)
                        <= 2.0 * tolerance =>
                {
                    if c.gap < last.gap {
                        *last = c;
                    }
                }
                _ => passes.push(c),
            }
        }
        if part.is_closed() && passes.len() > 1 {
            let (first, last) = (passes[0], passes[passes.len() - 1]);
            if metrics.distance(first.virtual_vertex, last.virtual_vertex) <= 2.0 * tolerance {
                if last.gap < first.gap {
                    passes[0] = last;
                }
                passes.pop();
            }
        }
        visits.extend(passes);
    }

    visits.sort_by(|a, b| {
        a.virtual_vertex
            .total_cmp(&b.virtual_vertex)
            .then(a.node.cmp(&b.node))
    });
    visits
}

fn mark_loop_nodes(nodes: &mut [Node], visits: &[Vec<Visit>], side: InputSide) {
    for part_visits in visits {
        let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
        for v in part_visits {
            *counts.entry(v.node).or_default() += 1;
        }
        for (&node, _) in counts.iter().filter(|(_, c)| **c > 1) {
            match side {
                InputSide::Source => nodes[node].source_loop = true,
                InputSide::Target => nodes[node].target_loop = true,
            }
        }
    }
}

/// Cut every part of `input` at its visits, classify the pieces and
/// collect the boundary loops.
fn split_input(
    side: InputSide,
    input: &MultiCurve,
    visits: &[Vec<Visit>],
    nodes: &[Node],
    partner: &PartnerView<'_>,
    tolerance: f64,
    arena: &mut SlotMap<SubcurveId, Subcurve>,
) -> (Vec<SubcurveId>, Vec<Curve>) {
    let mut order = Vec::new();
    let mut loops = Vec::new();

    for (part_index, (part, part_visits)) in input.parts().iter().zip(visits).enumerate() {
        let mut pieces = split_part(side, part_index, part, part_visits, nodes, tolerance);
        for sc in &mut pieces {
            sc.position = classify(&sc.points, sc.is_closed(), partner, tolerance);
            trace!(?side, part = part_index, from = ?sc.from_node, to = ?sc.to_node, position = ?sc.position, "subcurve");
        }

        let point_lists: Vec<&[Point3d]> = pieces.iter().map(|sc| sc.points.as_slice()).collect();
        let arcs = loop_arcs(part.is_closed(), part_visits, &point_lists);
        for arc in &arcs {
            let points = join_points(arc.iter().map(|&k| point_lists[k]));
            if let Ok(curve) = Curve::ring_with_tolerance(points, tolerance) {
                loops.push(curve);
            }
        }
        for k in arcs.into_iter().flatten() {
            pieces[k].kind = SubcurveKind::BoundaryLoop;
        }
        order.extend(pieces.into_iter().map(|sc| arena.insert(sc)));
    }
    (order, loops)
}

fn split_part(
    side: InputSide,
    part_index: usize,
    part: &Curve,
    visits: &[Visit],
    nodes: &[Node],
    tolerance: f64,
) -> Vec<Subcurve> {
    if visits.is_empty() {
        if !part.is_closed() {
            return Vec::new();
        }
        return vec![Subcurve {
            side,
            part: part_index,
            from_node: None,
            to_node: None,
            from_vertex: 0.0,
            to_vertex: 0.0,
            points: part.points().to_vec(),
            position: PartnerPosition::Outside,
            kind: SubcurveKind::Ordinary,
        }];
    }

    let count = if part.is_closed() {
        visits.len()
    } else {
        visits.len() - 1
    };
    (0..count)
        .map(|k| {
            let from = visits[k];
            let to = visits[(k + 1) % visits.len()];
            Subcurve {
                side,
                part: part_index,
                from_node: Some(from.node),
                to_node: Some(to.node),
                from_vertex: from.virtual_vertex,
                to_vertex: to.virtual_vertex,
                points: piece_points(part, &from, &to, nodes, tolerance),
                position: PartnerPosition::Outside,
                kind: SubcurveKind::Ordinary,
            }
        })
        .collect()
}

/// Vertices between two visits, with the ends moved onto the nodes.
fn piece_points(part: &Curve, from: &Visit, to: &Visit, nodes: &[Node], tolerance: f64) -> Vec<Point3d> {
    let start = nodes[from.node].location;
    let end = nodes[to.node].location;
    // Two nodes can sit on either side of the same spot on the part.
    if from.node != to.node && (to.virtual_vertex - from.virtual_vertex).abs() <= VERTEX_EPSILON {
        return vec![start, end];
    }
    let raw = path_between(part, from.virtual_vertex, to.virtual_vertex);
    let mut points = Vec::with_capacity(raw.len());
    points.push(start);
    points.extend(
        raw[1..raw.len() - 1]
            .iter()
            .filter(|p| !p.equals_xy(&start, tolerance) && !p.equals_xy(&end, tolerance)),
    );
    points.push(end);
    points
}

/// Inside, outside or along the partner's boundary. The probe is the
/// point of the subcurve farthest from the partner's boundary.
fn classify(points: &[Point3d], closed: bool, partner: &PartnerView<'_>, tolerance: f64) -> PartnerPosition {
    let mut segments: Vec<Segment> = points.windows(2).map(|w| Segment::new(w[0], w[1])).collect();
    if closed {
        if let (Some(first), Some(last)) = (points.first(), points.last()) {
            segments.push(Segment::new(*last, *first));
        }
    }
    let interior: &[Point3d] = if points.len() > 2 {
        &points[1..points.len() - 1]
    } else {
        &[]
    };
    let probe = segments
        .iter()
        .map(|s| s.point_at(0.5))
        .chain(interior.iter().copied())
        .map(|p| (p, partner.nearest(&p).map_or(f64::INFINITY, |(d, _)| d)))
        .max_by(|a, b| a.1.total_cmp(&b.1));

    let Some((probe, gap)) = probe else {
        return PartnerPosition::Outside;
    };
    if gap > tolerance {
        return if partner.region.contains(&probe) {
            PartnerPosition::Inside
        } else {
            PartnerPosition::Outside
        };
    }

    let longest = segments
        .iter()
        .max_by(|a, b| a.length_xy().total_cmp(&b.length_xy()));
    let opposite = longest.is_some_and(|seg| {
        partner
            .nearest(&seg.point_at(0.5))
            .is_some_and(|(_, along)| along.direction().dot_xy(&seg.direction()) < 0.0)
    });
    if opposite {
        PartnerPosition::OnBoundaryOpposite
    } else {
        PartnerPosition::OnBoundarySame
    }
}

/// Subcurve index lists of the boundary loops of one part. On a ring the
/// arc enclosing the most area at each repeated node is the ring itself
/// and not a loop; on an open part every return is a loop.
fn loop_arcs(closed: bool, visits: &[Visit], pieces: &[&[Point3d]]) -> Vec<Vec<usize>> {
    let mut by_node: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (k, v) in visits.iter().enumerate() {
        by_node.entry(v.node).or_default().push(k);
    }

    let mut arcs = Vec::new();
    for positions in by_node.values().filter(|p| p.len() > 1) {
        let mut node_arcs: Vec<Vec<usize>> =
            positions.windows(2).map(|w| (w[0]..w[1]).collect()).collect();
        if closed {
            let (first, last) = (positions[0], positions[positions.len() - 1]);
            node_arcs.push((last..pieces.len()).chain(0..first).collect());
            let area = |arc: &Vec<usize>| shoelace(&join_points(arc.iter().map(|&k| pieces[k]))).abs();
            let main = node_arcs
                .iter()
                .enumerate()
                .max_by(|a, b| area(a.1).total_cmp(&area(b.1)))
                .map(|(i, _)| i);
            if let Some(main) = main {
                node_arcs.remove(main);
            }
        }
        arcs.extend(node_arcs.into_iter().filter(|a| !a.is_empty()));
    }
    arcs
}

fn join_points<'a>(pieces: impl IntoIterator<Item = &'a [Point3d]>) -> Vec<Point3d> {
    let mut points: Vec<Point3d> = Vec::new();
    for piece in pieces {
        let skip = usize::from(!points.is_empty());
        points.extend(piece.iter().skip(skip));
    }
    points
}

fn shoelace(points: &[Point3d]) -> f64 {
    let n = points.len();
    (0..n)
        .map(|i| {
            let (a, b) = (points[i], points[(i + 1) % n]);
            (b.x - a.x) * (b.y + a.y)
        })
        .sum::<f64>()
        / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: f64, y0: f64, size: f64) -> Curve {
        Curve::ring_xy(&[
            (x0, y0),
            (x0, y0 + size),
            (x0 + size, y0 + size),
            (x0 + size, y0),
        ])
        .unwrap()
    }

    fn positions(nav: &SubcurveNavigator, side: InputSide) -> Vec<PartnerPosition> {
        nav.subcurves(side).map(|(_, sc)| sc.position).collect()
    }

    #[test]
    fn test_overlapping_squares_split_in_two() {
        let nav = SubcurveNavigator::new(&square(0.0, 0.0, 10.0), &square(5.0, 5.0, 10.0), 0.01).unwrap();
        assert_eq!(nav.nodes().len(), 2);
        for side in [InputSide::Source, InputSide::Target] {
            let mut found = positions(&nav, side);
            found.sort_by_key(|p| *p as u8);
            assert_eq!(found, vec![PartnerPosition::Inside, PartnerPosition::Outside]);
        }
        let inside_length: f64 = nav
            .source_subcurves()
            .filter(|(_, sc)| sc.is_inbound())
            .map(|(_, sc)| sc.length_xy())
            .sum();
        assert!((inside_length - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_disjoint_rings_stay_whole() {
        let nav = SubcurveNavigator::new(&square(0.0, 0.0, 2.0), &square(10.0, 0.0, 2.0), 0.01).unwrap();
        assert!(nav.nodes().is_empty());
        let (_, only) = nav.source_subcurves().next().unwrap();
        assert!(only.is_closed());
        assert_eq!(only.points.len(), 4);
        assert_eq!(only.position, PartnerPosition::Outside);
        assert_eq!(nav.target_subcurves().count(), 1);
    }

    #[test]
    fn test_ring_inside_partner_is_inbound() {
        let nav = SubcurveNavigator::new(&square(2.0, 2.0, 2.0), &square(0.0, 0.0, 10.0), 0.01).unwrap();
        assert_eq!(positions(&nav, InputSide::Source), vec![PartnerPosition::Inside]);
        assert_eq!(positions(&nav, InputSide::Target), vec![PartnerPosition::Outside]);
    }

    #[test]
    fn test_shared_edge_runs_opposite() {
        let nav = SubcurveNavigator::new(&square(0.0, 0.0, 10.0), &square(10.0, 0.0, 10.0), 0.01).unwrap();
        let shared: Vec<&Subcurve> = nav
            .source_subcurves()
            .map(|(_, sc)| sc)
            .filter(|sc| sc.position.is_on_boundary())
            .collect();
        assert_eq!(shared.len(), 1);
        assert_eq!(shared[0].position, PartnerPosition::OnBoundaryOpposite);
        assert!((shared[0].length_xy() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_identical_rings_run_same() {
        let nav = SubcurveNavigator::new(&square(0.0, 0.0, 4.0), &square(0.0, 0.0, 4.0), 0.01).unwrap();
        assert!(nav
            .source_subcurves()
            .all(|(_, sc)| sc.position == PartnerPosition::OnBoundarySame));
        let total: f64 = nav.source_subcurves().map(|(_, sc)| sc.length_xy()).sum();
        assert!((total - 16.0).abs() < 1e-9);
    }

    #[test]
    fn test_cut_line_pieces() {
        let line = Curve::open_xy(&[(-5.0, 5.0), (15.0, 5.0)]).unwrap();
        let nav = SubcurveNavigator::new(&square(0.0, 0.0, 10.0), &line, 0.01).unwrap();
        assert_eq!(nav.nodes().len(), 4);
        assert_eq!(
            positions(&nav, InputSide::Target),
            vec![PartnerPosition::Outside, PartnerPosition::Inside, PartnerPosition::Outside]
        );
        // A line encloses nothing.
        assert!(positions(&nav, InputSide::Source)
            .iter()
            .all(|p| *p == PartnerPosition::Outside));
    }

    #[test]
    fn test_line_starting_on_boundary() {
        let line = Curve::open_xy(&[(0.0, 5.0), (5.0, 5.0), (5.0, 10.0)]).unwrap();
        let nav = SubcurveNavigator::new(&square(0.0, 0.0, 10.0), &line, 0.01).unwrap();
        assert_eq!(positions(&nav, InputSide::Target), vec![PartnerPosition::Inside]);
        assert_eq!(nav.source_subcurves().count(), 2);
    }

    #[test]
    fn test_self_touching_ring_has_boundary_loop() {
        let ring = Curve::ring_xy(&[
            (0.0, 0.0),
            (0.0, 10.0),
            (10.0, 10.0),
            (10.0, 0.0),
            (5.0, 0.0),
            (6.0, 2.0),
            (4.0, 2.0),
            (5.0, 0.0),
        ])
        .unwrap();
        let nav = SubcurveNavigator::new(&ring, &square(20.0, 0.0, 2.0), 0.01).unwrap();
        assert_eq!(nav.source_boundary_loops().len(), 1);
        assert!((nav.source_boundary_loops()[0].signed_area_xy().abs() - 2.0).abs() < 1e-9);
        assert_eq!(nav.loop_node_locations(InputSide::Source), vec![Point3d::xy(5.0, 0.0)]);
        let loops = nav
            .source_subcurves()
            .filter(|(_, sc)| sc.is_boundary_loop())
            .count();
        assert_eq!(loops, 1);
        assert!(nav.target_boundary_loops().is_empty());
    }

    #[test]
    fn test_rotated_start_gives_same_subcurves() {
        let target = square(5.0, 5.0, 10.0);
        let mut rotated = square(0.0, 0.0, 10.0);
        rotated.rotate_start(2);
        let summary = |nav: &SubcurveNavigator| {
            let mut s: Vec<(u8, i64)> = nav
                .source_subcurves()
                .map(|(_, sc)| (sc.position as u8, (sc.length_xy() * 1e6).round() as i64))
                .collect();
            s.sort();
            s
        };
        let a = SubcurveNavigator::new(&square(0.0, 0.0, 10.0), &target, 0.01).unwrap();
        let b = SubcurveNavigator::new(&rotated, &target, 0.01).unwrap();
        assert_eq!(summary(&a), summary(&b));
    }
}
