//! Topological operations on rings and polylines under an XY tolerance.
//!
//! The pipeline is: [`intersection`] finds where two inputs meet,
//! [`navigator`] splits both inputs into classified subcurves between those
//! locations, [`assembly`] chains kept subcurves into rings, and
//! [`operations`] wires the three together per operation.

pub mod assembly;
pub mod intersection;
pub mod navigator;
pub mod operations;
pub mod predicates;
pub mod ring3d;
pub mod self_intersection;

pub use intersection::{
    DetectorFlags, IntersectionDetector, IntersectionPoint3D, IntersectionPointType,
    LinearStretch,
};
pub use navigator::{InputSide, Node, PartnerPosition, Subcurve, SubcurveId, SubcurveKind, SubcurveNavigator};
pub use operations::{
    clip_line_xy, cut_xy, difference_xy, intersect_lines_xy, intersect_xy, line_difference_xy,
    overlay_groups_xy, overlay_xy, union_xy, OverlayOp,
};
pub use ring3d::{intersect_ring_with_plane, intersect_rings_3d, IntersectionPath3D, RingPlaneSide};
pub use self_intersection::remove_linear_self_intersections;

use crate::geometry::curve::crossing_parity;
use crate::geometry::ring_group::ring_lies_within;
use crate::geometry::{Curve, Orientation, Point3d};

/// Factors this close to a vertex are treated as the vertex itself.
pub(crate) const VERTEX_EPSILON: f64 = 1e-9;

/// Cumulative XY lengths of one part, for measuring distances along it.
#[derive(Debug, Clone)]
pub(crate) struct PartMetrics {
    cumulative: Vec<f64>,
    closed: bool,
}

impl PartMetrics {
    pub(crate) fn new(curve: &Curve) -> Self {
        let mut cumulative = Vec::with_capacity(curve.segment_count() + 1);
        let mut total = 0.0;
        cumulative.push(0.0);
        for seg in curve.segments() {
            total += seg.length_xy();
            cumulative.push(total);
        }
        Self {
            cumulative,
            closed: curve.is_closed(),
        }
    }

    pub(crate) fn segment_count(&self) -> usize {
        self.cumulative.len() - 1
    }

    pub(crate) fn total(&self) -> f64 {
        self.cumulative[self.cumulative.len() - 1]
    }

    /// XY distance from the part start to a virtual vertex.
    pub(crate) fn along(&self, virtual_vertex: f64) -> f64 {
        let count = self.segment_count();
        if count == 0 {
            return 0.0;
        }
        let clamped = virtual_vertex.clamp(0.0, count as f64);
        let index = (clamped.floor() as usize).min(count - 1);
        let seg_len = self.cumulative[index + 1] - self.cumulative[index];
        self.cumulative[index] + seg_len * (clamped - index as f64)
    }

    /// Distance between two virtual vertices along the part, the short way
    /// round for rings.
    pub(crate) fn distance(&self, a: f64, b: f64) -> f64 {
        let d = (self.along(a) - self.along(b)).abs();
        if self.closed {
            d.min(self.total() - d)
        } else {
            d
        }
    }

    /// True if `x` lies on the stretch running forward from `from` to `to`,
    /// with `slack` of XY distance at both ends. `from == to` on a ring
    /// covers the whole ring.
    pub(crate) fn in_range(&self, from: f64, to: f64, x: f64, slack: f64) -> bool {
        let (a, b, c) = (self.along(from), self.along(to), self.along(x));
        if self.closed && b <= a {
            if (b - a).abs() <= f64::EPSILON {
                return true;
            }
            c >= a - slack || c <= b + slack
        } else {
            c >= a - slack && c <= b + slack
        }
    }
}

/// Bring a virtual vertex at the very end of a ring back to zero.
pub(crate) fn normalize_virtual_vertex(virtual_vertex: f64, curve: &Curve) -> f64 {
    let count = curve.segment_count() as f64;
    if curve.is_closed() && virtual_vertex >= count - VERTEX_EPSILON {
        0.0
    } else {
        virtual_vertex
    }
}

/// Index of the vertex at `virtual_vertex`, if it sits on one.
pub(crate) fn vertex_at(virtual_vertex: f64, curve: &Curve) -> Option<usize> {
    let rounded = virtual_vertex.round();
    if (virtual_vertex - rounded).abs() > VERTEX_EPSILON {
        return None;
    }
    let n = curve.point_count();
    let index = rounded as usize;
    if curve.is_closed() {
        Some(index % n)
    } else if index < n {
        Some(index)
    } else {
        None
    }
}

/// Points of `curve` from virtual vertex `from` forward to `to`, both ends
/// included. On a ring the path wraps past the start when `to <= from`.
pub(crate) fn path_between(curve: &Curve, from: f64, to: f64) -> Vec<Point3d> {
    let n = curve.point_count();
    let count = curve.segment_count() as f64;
    let end = if curve.is_closed() && to <= from + VERTEX_EPSILON {
        to + count
    } else {
        to
    };
    let mut points = vec![curve.virtual_point(from)];
    let mut k = from.floor() as usize + 1;
    while (k as f64) < end - VERTEX_EPSILON {
        if (k as f64) > from + VERTEX_EPSILON {
            points.push(curve.point(k % n));
        }
        k += 1;
    }
    let last = if end > count { end - count } else { end };
    points.push(curve.virtual_point(last));
    points
}

/// How a set of rings encloses area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RegionRule {
    /// A point is inside when an odd number of rings contain it.
    EvenOdd,
    /// Clockwise rings add material and counter-clockwise rings remove it;
    /// a counter-clockwise ring that no clockwise ring contains stands for
    /// everything outside it.
    Oriented,
}

/// The area enclosed by the closed parts of a shape.
#[derive(Debug, Clone)]
pub(crate) struct Region<'a> {
    rings: Vec<&'a Curve>,
    rule: RegionRule,
    base: i32,
}

impl<'a> Region<'a> {
    pub(crate) fn new(parts: &'a [Curve], rule: RegionRule, tolerance: f64) -> Self {
        let rings: Vec<&Curve> = parts
            .iter()
            .filter(|p| p.is_closed() && p.point_count() >= 3)
            .collect();
        let base = match rule {
            RegionRule::EvenOdd => 0,
            RegionRule::Oriented => rings
                .iter()
                .filter(|r| r.orientation() == Orientation::CounterClockwise)
                .filter(|hole| {
                    !rings.iter().any(|r| {
                        r.orientation() == Orientation::Clockwise
                            && ring_lies_within(hole, r, tolerance)
                    })
                })
                .count() as i32,
        };
        Self { rings, rule, base }
    }

    /// Strict containment, ignoring how close `point` is to a boundary.
    pub(crate) fn contains(&self, point: &Point3d) -> bool {
        if self.rings.is_empty() {
            return false;
        }
        match self.rule {
            RegionRule::EvenOdd => self
                .rings
                .iter()
                .filter(|r| crossing_parity(r.points(), point))
                .count()
                % 2
                == 1,
            RegionRule::Oriented => {
                let winding: i32 = self
                    .rings
                    .iter()
                    .filter(|r| crossing_parity(r.points(), point))
                    .map(|r| match r.orientation() {
                        Orientation::Clockwise => 1,
                        Orientation::CounterClockwise => -1,
                        Orientation::Undefined => 0,
                    })
                    .sum();
                winding + self.base > 0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Curve {
        Curve::ring_xy(&[(0.0, 0.0), (0.0, 4.0), (4.0, 4.0), (4.0, 0.0)]).unwrap()
    }

    #[test]
    fn test_path_between_wraps_on_rings() {
        let ring = square();
        let path = path_between(&ring, 3.5, 0.5);
        assert_eq!(
            path,
            vec![Point3d::xy(2.0, 0.0), Point3d::xy(0.0, 0.0), Point3d::xy(0.0, 2.0)]
        );
        let full = path_between(&ring, 1.0, 1.0);
        assert_eq!(full.len(), 5);
        assert_eq!(full[0], full[4]);
    }

    #[test]
    fn test_part_metrics_cyclic_distance() {
        let metrics = PartMetrics::new(&square());
        assert_eq!(metrics.total(), 16.0);
        assert_eq!(metrics.distance(0.25, 3.75), 2.0);
        assert!(metrics.in_range(3.5, 0.5, 0.0, 0.0));
        assert!(!metrics.in_range(3.5, 0.5, 2.0, 0.0));
    }

    #[test]
    fn test_oriented_region_treats_lone_hole_as_outside_area() {
        let hole = vec![square().reversed()];
        assert_eq!(hole[0].orientation(), Orientation::CounterClockwise);
        let region = Region::new(&hole, RegionRule::Oriented, 0.01);
        assert!(!region.contains(&Point3d::xy(2.0, 2.0)));
        assert!(region.contains(&Point3d::xy(10.0, 2.0)));

        let even_odd = Region::new(&hole, RegionRule::EvenOdd, 0.01);
        assert!(even_odd.contains(&Point3d::xy(2.0, 2.0)));
    }
}
