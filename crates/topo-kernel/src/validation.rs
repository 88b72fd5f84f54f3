//! Consistency checks for ring sets produced by the overlay operations.
//!
//! A valid result has only closed rings with area, clockwise exteriors
//! and counter-clockwise holes by nesting depth, and no two rings whose
//! interiors overlap.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::geometry::ring_group::ring_lies_within;
use crate::geometry::{Curve, MultiCurve, Orientation};
use crate::topology::intersection::{IntersectionDetector, IntersectionPointType};

/// What a finding is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FindingCode {
    /// The part is an open curve.
    NotClosed,
    /// Fewer than three vertices, or no area at the tolerance.
    ZeroArea,
    /// Orientation does not match the nesting depth.
    WrongOrientation,
    /// The ring crosses itself.
    SelfCrossing,
    /// Two rings cross.
    RingsCross,
    /// Two rings run along each other with their interiors on the same
    /// side.
    RingsOverlap,
}

impl fmt::Display for FindingCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RingFinding {
    pub code: FindingCode,
    /// Part index in the audited set.
    pub ring: usize,
    /// The second ring, for findings about a pair.
    pub other: Option<usize>,
    pub message: String,
}

impl fmt::Display for RingFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ring {}", self.code, self.ring)?;
        if let Some(other) = self.other {
            write!(f, " / ring {other}")?;
        }
        write!(f, ": {}", self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RingAudit {
    pub ring_count: usize,
    pub exterior_count: usize,
    pub hole_count: usize,
    pub findings: Vec<RingFinding>,
}

impl RingAudit {
    pub fn is_valid(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn findings_of(&self, code: FindingCode) -> Vec<&RingFinding> {
        self.findings.iter().filter(|f| f.code == code).collect()
    }
}

/// Check every part of `rings` and every pair of parts.
#[instrument(skip(rings), fields(parts = rings.part_count()))]
pub fn audit_rings(rings: &MultiCurve, tolerance: f64) -> RingAudit {
    let mut audit = RingAudit {
        ring_count: rings.part_count(),
        ..RingAudit::default()
    };
    let mut usable: Vec<(usize, &Curve)> = Vec::with_capacity(rings.part_count());
    for (i, ring) in rings.parts().iter().enumerate() {
        if !ring.is_closed() {
            audit.findings.push(finding(FindingCode::NotClosed, i, None, "open part in a ring set".into()));
        } else if ring.point_count() < 3 || ring.is_degenerate_ring(tolerance) {
            let message = format!("area {:.3e} over length {:.3e}", ring.signed_area_xy(), ring.length_xy());
            audit.findings.push(finding(FindingCode::ZeroArea, i, None, message));
        } else {
            usable.push((i, ring));
        }
    }

    let Ok(detector) = IntersectionDetector::new(tolerance) else {
        return audit;
    };
    check_orientation(&usable, tolerance, &mut audit);
    check_crossings(&usable, &detector, &mut audit);

    info!(
        valid = audit.is_valid(),
        rings = audit.ring_count,
        exteriors = audit.exterior_count,
        holes = audit.hole_count,
        finding_count = audit.findings.len(),
        "ring audit complete"
    );
    audit
}

fn finding(code: FindingCode, ring: usize, other: Option<usize>, message: String) -> RingFinding {
    RingFinding {
        code,
        ring,
        other,
        message,
    }
}

fn check_orientation(rings: &[(usize, &Curve)], tolerance: f64, audit: &mut RingAudit) {
    for &(i, ring) in rings {
        let area = ring.signed_area_xy().abs();
        let depth = rings
            .iter()
            .filter(|&&(j, other)| {
                j != i && other.signed_area_xy().abs() > area && ring_lies_within(ring, other, tolerance)
            })
            .count();
        let wanted = if depth % 2 == 0 {
            Orientation::Clockwise
        } else {
            Orientation::CounterClockwise
        };
        match ring.orientation() {
            Orientation::Clockwise => audit.exterior_count += 1,
            Orientation::CounterClockwise => audit.hole_count += 1,
            Orientation::Undefined => {}
        }
        if ring.orientation() != wanted {
            let message = format!("{:?} ring at nesting depth {depth}", ring.orientation());
            audit.findings.push(finding(FindingCode::WrongOrientation, i, None, message));
        }
    }
}

fn check_crossings(rings: &[(usize, &Curve)], detector: &IntersectionDetector, audit: &mut RingAudit) {
    for (k, &(i, ring)) in rings.iter().enumerate() {
        let crossings = detector
            .find_self_intersections(ring)
            .iter()
            .filter(|r| r.kind == IntersectionPointType::Crossing)
            .count();
        if crossings > 0 {
            let message = format!("{crossings} self crossings");
            audit.findings.push(finding(FindingCode::SelfCrossing, i, None, message));
        }

        for &(j, other) in &rings[k + 1..] {
            if !ring.envelope().intersects(&other.envelope(), detector.tolerance()) {
                continue;
            }
            let records = detector.find(ring, other);
            if let Some(cross) = records.iter().find(|r| r.kind == IntersectionPointType::Crossing) {
                let message = format!("crossing at ({:.3}, {:.3})", cross.point.x, cross.point.y);
                audit.findings.push(finding(FindingCode::RingsCross, i, Some(j), message));
            } else if let Some(stretch) = detector
                .linear_stretches(ring, other)
                .iter()
                .find(|s| !s.opposite_direction && !s.full_ring)
            {
                let message = format!("shared stretch from ({:.3}, {:.3})", stretch.start.x, stretch.start.y);
                audit.findings.push(finding(FindingCode::RingsOverlap, i, Some(j), message));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 0.01;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Curve {
        Curve::ring_xy(&[(x0, y0), (x0, y1), (x1, y1), (x1, y0)]).unwrap()
    }

    #[test]
    fn test_polygon_with_hole_is_valid() {
        let rings = MultiCurve::new(vec![rect(0.0, 0.0, 10.0, 10.0), rect(2.0, 2.0, 4.0, 4.0).reversed()]);
        let audit = audit_rings(&rings, TOL);
        assert!(audit.is_valid(), "{:?}", audit.findings);
        assert_eq!(audit.exterior_count, 1);
        assert_eq!(audit.hole_count, 1);
    }

    #[test]
    fn test_adjacent_polygons_are_valid() {
        let rings = MultiCurve::new(vec![rect(0.0, 0.0, 10.0, 10.0), rect(10.0, 0.0, 20.0, 10.0)]);
        assert!(audit_rings(&rings, TOL).is_valid());
    }

    #[test]
    fn test_crossing_rings_reported() {
        let rings = MultiCurve::new(vec![rect(0.0, 0.0, 10.0, 10.0), rect(5.0, 5.0, 15.0, 15.0)]);
        let audit = audit_rings(&rings, TOL);
        assert_eq!(audit.findings_of(FindingCode::RingsCross).len(), 1);
        assert_eq!(audit.findings_of(FindingCode::RingsCross)[0].other, Some(1));
    }

    #[test]
    fn test_nested_exterior_has_wrong_orientation() {
        let rings = MultiCurve::new(vec![rect(0.0, 0.0, 10.0, 10.0), rect(2.0, 2.0, 4.0, 4.0)]);
        let audit = audit_rings(&rings, TOL);
        let wrong = audit.findings_of(FindingCode::WrongOrientation);
        assert_eq!(wrong.len(), 1);
        assert_eq!(wrong[0].ring, 1);
    }

    #[test]
    fn test_open_and_flat_parts_reported() {
        let rings = MultiCurve::new(vec![
            Curve::open_xy(&[(0.0, 0.0), (1.0, 0.0)]).unwrap(),
            Curve::ring_xy(&[(0.0, 0.0), (5.0, 0.0), (10.0, 0.001)]).unwrap(),
        ]);
        let audit = audit_rings(&rings, TOL);
        assert_eq!(audit.findings_of(FindingCode::NotClosed).len(), 1);
        assert_eq!(audit.findings_of(FindingCode::ZeroArea).len(), 1);
        assert!(audit.findings[0].to_string().starts_with("[NotClosed] ring 0"));
    }

    #[test]
    fn test_bow_tie_crosses_itself() {
        let rings = MultiCurve::new(vec![Curve::ring_xy(&[(0.0, 0.0), (10.0, 10.0), (10.0, 0.0), (0.0, 4.0)]).unwrap()]);
        let audit = audit_rings(&rings, TOL);
        assert_eq!(audit.findings_of(FindingCode::SelfCrossing).len(), 1);
    }
}
