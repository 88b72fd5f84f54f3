//! Spatial predicates under an XY tolerance, plus variants that also
//! compare heights where the shapes meet.
//!
//! Rings are normally taken as areas whatever their orientation; only
//! [`touches_xy`] reads a counter-clockwise ring as everything outside it.

use tracing::trace;

use crate::error::Result;
use crate::geometry::{Curve, Linear, MultiCurve, Plane3d, Point3d};
use crate::Tolerance;

use super::intersection::{IntersectionDetector, IntersectionPoint3D, IntersectionPointType};
use super::navigator::{PartnerPosition, SubcurveNavigator};
use super::operations::{clip_line_xy, difference_xy, intersect_xy, line_difference_xy, orient_by_nesting};
use super::RegionRule;

/// Closed parts oriented by nesting, open parts as given.
fn normalized(shape: &impl Linear, tolerance: f64) -> MultiCurve {
    let (mut rings, lines): (Vec<Curve>, Vec<Curve>) = (0..shape.part_count())
        .map(|i| shape.part(i).clone())
        .partition(|p| p.is_closed());
    orient_by_nesting(&mut rings, tolerance);
    rings.extend(lines);
    MultiCurve::new(rings)
}

fn has_area(shape: &MultiCurve) -> bool {
    shape.parts().iter().any(|p| p.is_closed())
}

fn navigate(a: &impl Linear, b: &impl Linear, tolerance: f64) -> Result<SubcurveNavigator> {
    SubcurveNavigator::with_rule(
        &normalized(a, tolerance),
        &normalized(b, tolerance),
        tolerance,
        RegionRule::Oriented,
    )
}

/// The open interiors share a point: a subcurve of one runs inside the
/// other, or two areas run along a common boundary with their material on
/// the same side. Lines meet in their interiors where they cross or
/// overlap.
fn interiors_meet(navigator: &SubcurveNavigator) -> bool {
    let source_area = has_area(navigator.source());
    let target_area = has_area(navigator.target());
    if !source_area && !target_area {
        return navigator
            .intersections()
            .iter()
            .any(|r| r.kind == IntersectionPointType::Crossing || r.is_linear());
    }
    let both_areas = source_area && target_area;
    navigator
        .source_subcurves()
        .chain(navigator.target_subcurves())
        .any(|(_, sc)| {
            sc.is_inbound() || (both_areas && sc.position == PartnerPosition::OnBoundarySame)
        })
}

fn boundaries_meet(navigator: &SubcurveNavigator) -> bool {
    !navigator.intersections().is_empty()
}

pub fn disjoint_xy(a: &impl Linear, b: &impl Linear, tolerance: f64) -> Result<bool> {
    if !a.envelope().intersects(&b.envelope(), tolerance) {
        return Ok(true);
    }
    let navigator = navigate(a, b, tolerance)?;
    Ok(!boundaries_meet(&navigator) && !interiors_meet(&navigator))
}

pub fn interiors_intersect_xy(a: &impl Linear, b: &impl Linear, tolerance: f64) -> Result<bool> {
    if !a.envelope().intersects(&b.envelope(), tolerance) {
        return Ok(false);
    }
    Ok(interiors_meet(&navigate(a, b, tolerance)?))
}

/// The shapes meet on their boundaries, with their ring orientation
/// respected: a counter-clockwise ring stands for the area outside it, so
/// a polygon touching a hole's boundary from within the hole touches it.
pub fn touches_xy(a: &impl Linear, b: &impl Linear, tolerance: f64) -> Result<bool> {
    if !a.envelope().intersects(&b.envelope(), tolerance) {
        return Ok(false);
    }
    let navigator = SubcurveNavigator::with_rule(a, b, tolerance, RegionRule::Oriented)?;
    Ok(boundaries_meet(&navigator) && !interiors_meet(&navigator))
}

/// The shapes meet on their boundaries only, every ring taken as the area
/// it encloses.
pub fn touches_xy_disregarding_orientation(a: &impl Linear, b: &impl Linear, tolerance: f64) -> Result<bool> {
    if !a.envelope().intersects(&b.envelope(), tolerance) {
        return Ok(false);
    }
    let navigator = navigate(a, b, tolerance)?;
    Ok(boundaries_meet(&navigator) && !interiors_meet(&navigator))
}

/// Nothing of `b` lies outside `a` and some of it lies inside. `a` must be
/// an area; a line contains nothing here.
pub fn contains_xy(a: &impl Linear, b: &impl Linear, tolerance: f64) -> Result<bool> {
    if b.part_count() == 0 || !a.is_area() {
        return Ok(false);
    }
    if !a.envelope().contains(&b.envelope(), tolerance) {
        return Ok(false);
    }
    if b.is_area() {
        Ok(difference_xy(b, a, tolerance)?.is_empty() && !intersect_xy(b, a, tolerance)?.is_empty())
    } else {
        Ok(line_difference_xy(b, a, tolerance)?.is_empty() && !clip_line_xy(b, a, tolerance)?.is_empty())
    }
}

/// Same area (or same lines) in XY, regardless of start vertex,
/// orientation or redundant vertices.
pub fn equals_xy(a: &impl Linear, b: &impl Linear, tolerance: f64) -> Result<bool> {
    if a.is_area() != b.is_area() {
        return Ok(false);
    }
    if !a.is_area() {
        let detector = IntersectionDetector::new(tolerance)?;
        let shared = detector.intersection_lines(a, b).length_xy();
        let slack = tolerance * (a.part_count() + b.part_count()) as f64;
        return Ok((shared - a.length_xy()).abs() <= slack && (shared - b.length_xy()).abs() <= slack);
    }
    Ok(contains_xy(a, b, tolerance)? && contains_xy(b, a, tolerance)?)
}

/// Z of `shape` at its location closest to `point`; NaN where undefined.
fn z_along(shape: &impl Linear, point: &Point3d) -> f64 {
    (0..shape.part_count())
        .flat_map(|i| shape.part(i).segments())
        .map(|s| (s.distance_xy(point), s))
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .and_then(|(_, s)| s.z_at(point))
        .unwrap_or(f64::NAN)
}

fn contact_at_same_height(record: &IntersectionPoint3D, a: &impl Linear, b: &impl Linear, tolerance: &Tolerance) -> bool {
    tolerance.z_compatible(z_along(a, &record.point), z_along(b, &record.point))
}

/// Z of an area's plane at `point`, falling back to its boundary.
fn area_z(area: &impl Linear, point: &Point3d) -> f64 {
    (0..area.part_count())
        .map(|i| area.part(i))
        .find(|p| p.is_closed())
        .and_then(|ring| Plane3d::from_ring(ring).ok())
        .and_then(|plane| plane.z_at(point.x, point.y).ok())
        .unwrap_or_else(|| z_along(area, point))
}

fn vertices(shape: &impl Linear) -> impl Iterator<Item = Point3d> + '_ {
    (0..shape.point_count()).filter_map(|i| shape.point(i))
}

/// Disjoint in XY, or every place where the shapes meet in XY lies at
/// different heights. Interiors overlapping without boundary contact are
/// compared through the outer shape's plane.
pub fn disjoint_xyz(a: &impl Linear, b: &impl Linear, tolerance: &Tolerance) -> Result<bool> {
    if disjoint_xy(a, b, tolerance.xy)? {
        return Ok(true);
    }
    let navigator = navigate(a, b, tolerance.xy)?;
    if boundaries_meet(&navigator) {
        let any_contact = navigator
            .intersections()
            .iter()
            .any(|r| contact_at_same_height(r, a, b, tolerance));
        trace!(any_contact, "boundary contacts compared in Z");
        return Ok(!any_contact);
    }
    // One lies inside the other.
    let same_height = if contains_xy(a, b, tolerance.xy)? {
        vertices(b).any(|p| tolerance.z_compatible(area_z(a, &p), p.z))
    } else {
        vertices(a).any(|p| tolerance.z_compatible(area_z(b, &p), p.z))
    };
    Ok(!same_height)
}

pub fn touches_xyz(a: &impl Linear, b: &impl Linear, tolerance: &Tolerance) -> Result<bool> {
    if !touches_xy(a, b, tolerance.xy)? {
        return Ok(false);
    }
    let navigator = SubcurveNavigator::with_rule(a, b, tolerance.xy, RegionRule::Oriented)?;
    Ok(navigator
        .intersections()
        .iter()
        .any(|r| contact_at_same_height(r, a, b, tolerance)))
}

/// Contained in XY, with every defined vertex height of `b` on `a`.
pub fn contains_xyz(a: &impl Linear, b: &impl Linear, tolerance: &Tolerance) -> Result<bool> {
    if !contains_xy(a, b, tolerance.xy)? {
        return Ok(false);
    }
    Ok(vertices(b).all(|p| tolerance.z_compatible(area_z(a, &p), p.z)))
}

/// Equal in XY, with matching heights along both boundaries.
pub fn equals_xyz(a: &impl Linear, b: &impl Linear, tolerance: &Tolerance) -> Result<bool> {
    if !equals_xy(a, b, tolerance.xy)? {
        return Ok(false);
    }
    Ok(vertices(a).all(|p| tolerance.z_compatible(z_along(b, &p), p.z))
        && vertices(b).all(|p| tolerance.z_compatible(z_along(a, &p), p.z)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::RingGroup;

    const TOL: f64 = 0.01;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Curve {
        Curve::ring_xy(&[(x0, y0), (x0, y1), (x1, y1), (x1, y0)]).unwrap()
    }

    fn rect_z(x0: f64, y0: f64, x1: f64, y1: f64, z: f64) -> Curve {
        Curve::ring(vec![
            Point3d::new(x0, y0, z),
            Point3d::new(x0, y1, z),
            Point3d::new(x1, y1, z),
            Point3d::new(x1, y0, z),
        ])
        .unwrap()
    }

    #[test]
    fn test_disjoint_and_touching() {
        let a = rect(0.0, 0.0, 10.0, 10.0);
        assert!(disjoint_xy(&a, &rect(20.0, 0.0, 30.0, 10.0), TOL).unwrap());

        let corner = rect(10.0, 10.0, 20.0, 20.0);
        assert!(!disjoint_xy(&a, &corner, TOL).unwrap());
        assert!(touches_xy(&a, &corner, TOL).unwrap());
        assert!(!interiors_intersect_xy(&a, &corner, TOL).unwrap());

        let edge = rect(10.0, 2.0, 20.0, 8.0);
        assert!(touches_xy_disregarding_orientation(&a, &edge, TOL).unwrap());
    }

    #[test]
    fn test_overlap_is_not_a_touch() {
        let a = rect(0.0, 0.0, 10.0, 10.0);
        let b = rect(5.0, 5.0, 15.0, 15.0);
        assert!(interiors_intersect_xy(&a, &b, TOL).unwrap());
        assert!(!touches_xy(&a, &b, TOL).unwrap());
        assert!(!disjoint_xy(&a, &b, TOL).unwrap());
    }

    #[test]
    fn test_nested_without_contact_is_not_disjoint() {
        let outer = rect(0.0, 0.0, 10.0, 10.0);
        let inner = rect(2.0, 2.0, 4.0, 4.0);
        assert!(!disjoint_xy(&outer, &inner, TOL).unwrap());
        assert!(contains_xy(&outer, &inner, TOL).unwrap());
        assert!(!contains_xy(&inner, &outer, TOL).unwrap());
    }

    #[test]
    fn test_touch_respecting_orientation_reads_holes() {
        let hole = rect(0.0, 0.0, 10.0, 10.0).reversed();
        let inside = rect(0.0, 2.0, 3.0, 5.0);
        assert!(touches_xy(&hole, &inside, TOL).unwrap());
        assert!(!touches_xy_disregarding_orientation(&hole, &inside, TOL).unwrap());
    }

    #[test]
    fn test_equals_ignores_start_and_orientation() {
        let a = rect(0.0, 0.0, 4.0, 4.0);
        let mut b = a.reversed();
        b.rotate_start(2);
        assert!(equals_xy(&a, &b, TOL).unwrap());
        let with_extra_vertex = Curve::ring_xy(&[(0.0, 0.0), (0.0, 2.0), (0.0, 4.0), (4.0, 4.0), (4.0, 0.0)]).unwrap();
        assert!(equals_xy(&a, &with_extra_vertex, TOL).unwrap());
        assert!(!equals_xy(&a, &rect(0.0, 0.0, 4.0, 5.0), TOL).unwrap());
    }

    #[test]
    fn test_line_predicates() {
        let area = RingGroup::from_exterior(rect(0.0, 0.0, 10.0, 10.0)).unwrap();
        let crossing = Curve::open_xy(&[(-1.0, 5.0), (11.0, 5.0)]).unwrap();
        let inside = Curve::open_xy(&[(1.0, 1.0), (9.0, 9.0)]).unwrap();
        assert!(!disjoint_xy(&area, &crossing, TOL).unwrap());
        assert!(!contains_xy(&area, &crossing, TOL).unwrap());
        assert!(contains_xy(&area, &inside, TOL).unwrap());

        let other = Curve::open_xy(&[(5.0, -1.0), (5.0, 11.0)]).unwrap();
        assert!(interiors_intersect_xy(&crossing, &other, TOL).unwrap());
    }

    #[test]
    fn test_z_aware_touch() {
        let tol = Tolerance::new(TOL, 0.1).unwrap();
        let low = rect_z(0.0, 0.0, 10.0, 10.0, 0.0);
        let high = rect_z(10.0, 0.0, 20.0, 10.0, 5.0);
        let level = rect_z(10.0, 0.0, 20.0, 10.0, 0.05);

        assert!(touches_xy(&low, &high, TOL).unwrap());
        assert!(!touches_xyz(&low, &high, &tol).unwrap());
        assert!(disjoint_xyz(&low, &high, &tol).unwrap());
        assert!(touches_xyz(&low, &level, &tol).unwrap());
        assert!(!disjoint_xyz(&low, &level, &tol).unwrap());
    }

    #[test]
    fn test_z_aware_containment_and_equality() {
        let tol = Tolerance::new(TOL, 0.1).unwrap();
        let floor = rect_z(0.0, 0.0, 10.0, 10.0, 0.0);
        let tile = rect_z(2.0, 2.0, 4.0, 4.0, 0.0);
        let lifted = rect_z(2.0, 2.0, 4.0, 4.0, 3.0);
        assert!(contains_xyz(&floor, &tile, &tol).unwrap());
        assert!(!contains_xyz(&floor, &lifted, &tol).unwrap());
        assert!(!disjoint_xyz(&floor, &tile, &tol).unwrap());
        assert!(disjoint_xyz(&floor, &lifted, &tol).unwrap());

        assert!(equals_xyz(&floor, &floor.reversed(), &tol).unwrap());
        assert!(!equals_xyz(&floor, &rect_z(0.0, 0.0, 10.0, 10.0, 1.0), &tol).unwrap());
    }
}
