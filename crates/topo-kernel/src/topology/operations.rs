//! Union, intersection, difference and cut of ring sets, plus the line
//! variants that split a polyline by an area.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

use crate::config::{LoopPolicy, OverlayConfig};
use crate::error::{check_tolerance, Result, TopologyError};
use crate::geometry::ring_group::{group_rings, ring_lies_within};
use crate::geometry::{Curve, Linear, MultiCurve, Orientation, Point3d, RingGroup};

use super::assembly::{finish_rings, prune_dangles, resolve_boundary_loops, trace_rings, Edge};
use super::intersection::IntersectionDetector;
use super::navigator::{InputSide, PartnerPosition, SubcurveNavigator};
use super::RegionRule;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OverlayOp {
    Union,
    Intersection,
    /// Source minus target.
    Difference,
}

impl OverlayOp {
    /// Whether a subcurve survives the operation, and if so whether it is
    /// walked backwards. Along a shared boundary only the source's copy is
    /// ever kept.
    fn keep(self, side: InputSide, position: PartnerPosition) -> Option<bool> {
        use InputSide::{Source, Target};
        use PartnerPosition::{Inside, OnBoundaryOpposite, OnBoundarySame, Outside};
        match (self, side, position) {
            (OverlayOp::Union, _, Outside) => Some(false),
            (OverlayOp::Union, Source, OnBoundarySame) => Some(false),
            (OverlayOp::Intersection, _, Inside) => Some(false),
            (OverlayOp::Intersection, Source, OnBoundarySame) => Some(false),
            (OverlayOp::Difference, Source, Outside) => Some(false),
            (OverlayOp::Difference, Source, OnBoundaryOpposite) => Some(false),
            (OverlayOp::Difference, Target, Inside) => Some(true),
            _ => None,
        }
    }
}

/// Run one overlay operation on two ring sets. Rings may come in either
/// orientation; each is oriented by how deeply the other rings of its set
/// nest it. The result holds clockwise exteriors and counter-clockwise
/// holes.
#[instrument(skip(source, target), fields(tolerance = config.tolerance))]
pub fn overlay_xy(
    source: &impl Linear,
    target: &impl Linear,
    op: OverlayOp,
    config: &OverlayConfig,
) -> Result<MultiCurve> {
    config.validate()?;
    let tolerance = config.tolerance;
    let source = prepare_area(source, tolerance)?;
    let target = prepare_area(target, tolerance)?;
    let navigator = SubcurveNavigator::with_rule(&source, &target, tolerance, RegionRule::Oriented)?;

    let mut loops: Vec<Vec<Point3d>> = Vec::new();
    let mut edges: Vec<Edge> = Vec::new();
    for side in [InputSide::Source, InputSide::Target] {
        for (_, subcurve) in navigator.subcurves(side) {
            let Some(reversed) = op.keep(side, subcurve.position) else {
                continue;
            };
            if subcurve.is_closed() {
                let mut points = subcurve.points.clone();
                if reversed {
                    points.reverse();
                }
                loops.push(points);
            } else if let Some(edge) = Edge::from_subcurve(subcurve, reversed) {
                edges.push(edge);
            }
        }
    }

    loops.extend(trace_rings(&edges, navigator.nodes().len(), tolerance));
    let rings = finish_rings(loops, config);
    let rings = resolve_boundary_loops(rings, &preserved_loops(&navigator, config), tolerance);
    let result = MultiCurve::new(rings);
    debug!(rings = result.part_count(), area = result.area_xy(), "overlay complete");
    Ok(result)
}

/// Like [`overlay_xy`], with each hole assigned to its exterior.
pub fn overlay_groups_xy(
    source: &impl Linear,
    target: &impl Linear,
    op: OverlayOp,
    config: &OverlayConfig,
) -> Result<Vec<RingGroup>> {
    let rings = overlay_xy(source, target, op, config)?;
    Ok(group_rings(rings.into_parts(), config.tolerance))
}

pub fn union_xy(source: &impl Linear, target: &impl Linear, tolerance: f64) -> Result<MultiCurve> {
    overlay_xy(source, target, OverlayOp::Union, &OverlayConfig::with_tolerance(tolerance))
}

/// Empty when the inputs only touch.
pub fn intersect_xy(source: &impl Linear, target: &impl Linear, tolerance: f64) -> Result<MultiCurve> {
    overlay_xy(
        source,
        target,
        OverlayOp::Intersection,
        &OverlayConfig::with_tolerance(tolerance),
    )
}

/// Parts of `source` outside `target`.
///
/// A target that exactly fills a hole of the source removes nothing: the
/// result is the source unchanged, hole included, so that
/// `difference + intersection` still adds up to the source area.
pub fn difference_xy(source: &impl Linear, target: &impl Linear, tolerance: f64) -> Result<MultiCurve> {
    overlay_xy(
        source,
        target,
        OverlayOp::Difference,
        &OverlayConfig::with_tolerance(tolerance),
    )
}

/// Split an area along a cut line. Returns the resulting polygons, or
/// nothing when the line does not separate any part of the area.
#[instrument(skip(area, cut_line), fields(tolerance = config.tolerance))]
pub fn cut_xy(area: &impl Linear, cut_line: &impl Linear, config: &OverlayConfig) -> Result<Vec<RingGroup>> {
    config.validate()?;
    let tolerance = config.tolerance;
    let source = prepare_area(area, tolerance)?;
    let line = cut_line.to_multicurve();
    let navigator = SubcurveNavigator::with_rule(&source, &line, tolerance, RegionRule::Oriented)?;

    if !navigator.target_subcurves().any(|(_, sc)| sc.is_inbound()) {
        debug!("cut line does not enter the area");
        return Ok(Vec::new());
    }

    let mut loops: Vec<Vec<Point3d>> = Vec::new();
    let mut edges: Vec<Edge> = Vec::new();
    for (_, subcurve) in navigator.source_subcurves() {
        match Edge::from_subcurve(subcurve, false) {
            Some(edge) => edges.push(edge),
            None => loops.push(subcurve.points.clone()),
        }
    }
    for (_, subcurve) in navigator.target_subcurves().filter(|(_, sc)| sc.is_inbound()) {
        match (Edge::from_subcurve(subcurve, false), Edge::from_subcurve(subcurve, true)) {
            (Some(forward), Some(backward)) => {
                edges.push(forward);
                edges.push(backward);
            }
            _ => {
                // A closed cut ring inside the area cuts out an island.
                let mut reversed = subcurve.points.clone();
                reversed.reverse();
                loops.push(subcurve.points.clone());
                loops.push(reversed);
            }
        }
    }

    let edges = prune_dangles(edges, navigator.nodes().len());
    loops.extend(trace_rings(&edges, navigator.nodes().len(), tolerance));
    let rings = finish_rings(loops, config);
    let rings = resolve_boundary_loops(rings, &preserved_loops(&navigator, config), tolerance);

    let pieces = group_rings(rings, tolerance);
    let original = group_rings(source.into_parts(), tolerance).len();
    if pieces.len() <= original {
        debug!(pieces = pieces.len(), "cut line does not separate the area");
        return Ok(Vec::new());
    }
    debug!(pieces = pieces.len(), "area cut");
    Ok(pieces)
}

/// The stretches along which source and target boundaries coincide.
pub fn intersect_lines_xy(source: &impl Linear, target: &impl Linear, tolerance: f64) -> Result<MultiCurve> {
    let detector = IntersectionDetector::new(tolerance)?;
    Ok(detector.intersection_lines(source, target))
}

/// The parts of `line` strictly inside `area`.
pub fn clip_line_xy(line: &impl Linear, area: &impl Linear, tolerance: f64) -> Result<MultiCurve> {
    line_pieces(line, area, tolerance, PartnerPosition::Inside)
}

/// The parts of `line` strictly outside `area`. Stretches along the area's
/// boundary belong to neither this nor [`clip_line_xy`].
pub fn line_difference_xy(line: &impl Linear, area: &impl Linear, tolerance: f64) -> Result<MultiCurve> {
    line_pieces(line, area, tolerance, PartnerPosition::Outside)
}

fn line_pieces(
    line: &impl Linear,
    area: &impl Linear,
    tolerance: f64,
    wanted: PartnerPosition,
) -> Result<MultiCurve> {
    check_tolerance(tolerance)?;
    let area = prepare_area(area, tolerance)?;
    let navigator = SubcurveNavigator::with_rule(line, &area, tolerance, RegionRule::Oriented)?;

    let mut result = MultiCurve::empty();
    let mut current: Option<(usize, Vec<Point3d>)> = None;
    let flush = |current: &mut Option<(usize, Vec<Point3d>)>, result: &mut MultiCurve| {
        if let Some((_, points)) = current.take() {
            if let Ok(curve) = Curve::open(points) {
                result.push(curve);
            }
        }
    };

    for (_, subcurve) in navigator.source_subcurves() {
        if subcurve.position != wanted {
            flush(&mut current, &mut result);
            continue;
        }
        if subcurve.is_closed() {
            flush(&mut current, &mut result);
            if let Ok(ring) = subcurve.to_curve() {
                result.push(ring);
            }
            continue;
        }
        let continues = matches!(&current, Some((part, _)) if *part == subcurve.part);
        if !continues {
            flush(&mut current, &mut result);
            current = Some((subcurve.part, subcurve.points.clone()));
        } else if let Some((_, points)) = current.as_mut() {
            points.extend(subcurve.points.iter().skip(1));
        }
    }
    flush(&mut current, &mut result);
    trace!(pieces = result.part_count(), "line split by area");
    Ok(result)
}

/// Loop locations kept intact under the configured policy.
fn preserved_loops(navigator: &SubcurveNavigator, config: &OverlayConfig) -> Vec<Point3d> {
    match config.loop_policy {
        LoopPolicy::SplitLoops => Vec::new(),
        LoopPolicy::PreserveInputLoops => {
            let mut nodes = navigator.loop_node_locations(InputSide::Source);
            nodes.extend(navigator.loop_node_locations(InputSide::Target));
            nodes
        }
    }
}

/// The rings of an area input, oriented by nesting depth. Rings without XY
/// area are skipped; open parts are an error.
pub(crate) fn prepare_area(shape: &impl Linear, tolerance: f64) -> Result<MultiCurve> {
    let mut rings: Vec<Curve> = Vec::with_capacity(shape.part_count());
    for i in 0..shape.part_count() {
        let part = shape.part(i);
        if !part.is_closed() {
            return Err(TopologyError::NotClosed);
        }
        if part.orientation() == Orientation::Undefined {
            trace!(part = i, "ring without XY area skipped");
            continue;
        }
        rings.push(part.clone());
    }
    orient_by_nesting(&mut rings, tolerance);
    Ok(MultiCurve::new(rings))
}

/// Rings inside an even number of others become clockwise, the rest
/// counter-clockwise.
pub(crate) fn orient_by_nesting(rings: &mut [Curve], tolerance: f64) {
    let depths: Vec<usize> = rings
        .iter()
        .enumerate()
        .map(|(i, ring)| {
            let area = ring.signed_area_xy().abs();
            rings
                .iter()
                .enumerate()
                .filter(|&(j, other)| {
                    j != i
                        && other.signed_area_xy().abs() > area
                        && other.envelope().contains(&ring.envelope(), tolerance)
                        && ring_lies_within(ring, other, tolerance)
                })
                .count()
        })
        .collect();

    for (ring, depth) in rings.iter_mut().zip(depths) {
        let wanted = if depth % 2 == 0 {
            Orientation::Clockwise
        } else {
            Orientation::CounterClockwise
        };
        let actual = ring.orientation();
        if actual != Orientation::Undefined && actual != wanted {
            ring.reverse();
        }
    }
}
