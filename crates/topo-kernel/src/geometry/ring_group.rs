use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, TopologyError};

use super::curve::{Curve, Orientation, PointLocation};
use super::multicurve::MultiCurve;
use super::point::Point3d;

/// A polygon: one exterior ring plus any number of holes.
///
/// The exterior is kept clockwise and the holes counter-clockwise. Holes may
/// touch each other or the exterior in a point or along a line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RingGroupRepr")]
pub struct RingGroup {
    exterior: Curve,
    interiors: Vec<Curve>,
}

#[derive(Deserialize)]
struct RingGroupRepr {
    exterior: Curve,
    #[serde(default)]
    interiors: Vec<Curve>,
}

impl TryFrom<RingGroupRepr> for RingGroup {
    type Error = TopologyError;

    fn try_from(repr: RingGroupRepr) -> Result<Self> {
        Self::new(repr.exterior, repr.interiors)
    }
}

impl RingGroup {
    /// Build a polygon, reversing rings as needed so that the exterior is
    /// clockwise and holes are counter-clockwise. Rings without a defined
    /// orientation (vertical rings) are kept as given.
    pub fn new(exterior: Curve, interiors: Vec<Curve>) -> Result<Self> {
        if !exterior.is_closed() || interiors.iter().any(|r| !r.is_closed()) {
            return Err(TopologyError::NotClosed);
        }
        let mut group = Self {
            exterior: oriented(exterior, Orientation::Clockwise),
            interiors: Vec::with_capacity(interiors.len()),
        };
        for ring in interiors {
            group.add_interior(ring)?;
        }
        Ok(group)
    }

    pub fn from_exterior(exterior: Curve) -> Result<Self> {
        Self::new(exterior, Vec::new())
    }

    /// Polygon from raw XY coordinates of the exterior ring.
    pub fn from_xy(coords: &[(f64, f64)]) -> Result<Self> {
        Self::from_exterior(Curve::ring_xy(coords)?)
    }

    pub fn add_interior(&mut self, ring: Curve) -> Result<()> {
        if !ring.is_closed() {
            return Err(TopologyError::NotClosed);
        }
        self.interiors
            .push(oriented(ring, Orientation::CounterClockwise));
        Ok(())
    }

    pub fn exterior(&self) -> &Curve {
        &self.exterior
    }

    pub fn interiors(&self) -> &[Curve] {
        &self.interiors
    }

    pub fn interior_count(&self) -> usize {
        self.interiors.len()
    }

    /// Exterior area minus hole areas.
    pub fn area_xy(&self) -> f64 {
        self.exterior.signed_area_xy() + self.interiors.iter().map(|r| r.signed_area_xy()).sum::<f64>()
    }

    pub fn length_xy(&self) -> f64 {
        self.exterior.length_xy() + self.interiors.iter().map(|r| r.length_xy()).sum::<f64>()
    }

    pub fn is_vertical(&self) -> bool {
        self.exterior.orientation() == Orientation::Undefined
    }

    /// True if the exterior has no orientation at `tolerance`.
    pub fn is_vertical_within(&self, tolerance: f64) -> bool {
        self.exterior.orientation_within(tolerance) == Orientation::Undefined
    }

    /// Every ring, exterior first.
    pub fn rings(&self) -> impl Iterator<Item = &Curve> {
        std::iter::once(&self.exterior).chain(self.interiors.iter())
    }

    pub fn to_multicurve(&self) -> MultiCurve {
        MultiCurve::new(self.rings().cloned().collect())
    }

    pub fn into_multicurve(self) -> MultiCurve {
        let mut parts = Vec::with_capacity(1 + self.interiors.len());
        parts.push(self.exterior);
        parts.extend(self.interiors);
        MultiCurve::new(parts)
    }

    /// Locate a point relative to the polygon area (holes excluded).
    pub fn locate_point_xy(&self, point: &Point3d, tolerance: f64) -> PointLocation {
        match self.exterior.locate_point_xy(point, tolerance) {
            PointLocation::Inside => {}
            other => return other,
        }
        for hole in &self.interiors {
            match hole.locate_point_xy(point, tolerance) {
                PointLocation::Inside => return PointLocation::Outside,
                PointLocation::OnBoundary => return PointLocation::OnBoundary,
                PointLocation::Outside => {}
            }
        }
        PointLocation::Inside
    }
}

fn oriented(mut ring: Curve, wanted: Orientation) -> Curve {
    let actual = ring.orientation();
    if actual != Orientation::Undefined && actual != wanted {
        ring.reverse();
    }
    ring
}

/// Group clockwise exteriors and counter-clockwise holes into polygons. Each
/// hole goes to the smallest exterior containing it; degenerate rings are
/// dropped.
pub fn group_rings(rings: Vec<Curve>, tolerance: f64) -> Vec<RingGroup> {
    let mut exteriors: Vec<Curve> = Vec::new();
    let mut holes: Vec<Curve> = Vec::new();
    for ring in rings {
        match ring.orientation() {
            Orientation::Clockwise => exteriors.push(ring),
            Orientation::CounterClockwise => holes.push(ring),
            Orientation::Undefined => {}
        }
    }

    let mut assigned: Vec<Vec<Curve>> = vec![Vec::new(); exteriors.len()];
    for hole in holes {
        let container = exteriors
            .iter()
            .enumerate()
            .filter(|(_, ext)| ext.envelope().contains(&hole.envelope(), tolerance))
            .filter(|(_, ext)| ring_lies_within(&hole, ext, tolerance))
            .min_by(|(_, a), (_, b)| a.signed_area_xy().total_cmp(&b.signed_area_xy()))
            .map(|(i, _)| i);
        match container {
            Some(i) => assigned[i].push(hole),
            None => warn!(area = hole.signed_area_xy(), "hole without containing exterior dropped"),
        }
    }

    exteriors
        .into_iter()
        .zip(assigned)
        .map(|(exterior, interiors)| RingGroup {
            exterior,
            interiors,
        })
        .collect()
}

/// True if `inner` lies within `outer`: no vertex or segment midpoint of
/// `inner` is outside, and at least one is strictly inside (or the rings
/// share their whole boundary).
pub(crate) fn ring_lies_within(inner: &Curve, outer: &Curve, tolerance: f64) -> bool {
    let mut any_inside = false;
    let probes = inner
        .points()
        .iter()
        .copied()
        .chain(inner.segments().map(|s| s.point_at(0.5)));
    for p in probes {
        match outer.locate_point_xy(&p, tolerance) {
            PointLocation::Outside => return false,
            PointLocation::Inside => any_inside = true,
            PointLocation::OnBoundary => {}
        }
    }
    any_inside || inner.signed_area_xy().abs() <= outer.signed_area_xy().abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: f64, y0: f64, size: f64) -> Curve {
        Curve::ring_xy(&[
            (x0, y0),
            (x0 + size, y0),
            (x0 + size, y0 + size),
            (x0, y0 + size),
        ])
        .unwrap()
    }

    #[test]
    fn test_new_normalises_orientation() {
        // Both rings given counter-clockwise.
        let group = RingGroup::new(square(0.0, 0.0, 10.0), vec![square(2.0, 2.0, 2.0)]).unwrap();
        assert_eq!(group.exterior().orientation(), Orientation::Clockwise);
        assert_eq!(group.interiors()[0].orientation(), Orientation::CounterClockwise);
        assert!((group.area_xy() - 96.0).abs() < 1e-9);
    }

    #[test]
    fn test_open_ring_rejected() {
        let open = Curve::open_xy(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]).unwrap();
        assert_eq!(RingGroup::from_exterior(open).unwrap_err(), TopologyError::NotClosed);
    }

    #[test]
    fn test_deserialize_goes_through_constructor() {
        let ccw = r#"{"exterior":{"points":[{"x":0.0,"y":0.0},{"x":10.0,"y":0.0},{"x":10.0,"y":10.0},{"x":0.0,"y":10.0}],"closed":true}}"#;
        let group: RingGroup = serde_json::from_str(ccw).unwrap();
        assert_eq!(group.exterior().orientation(), Orientation::Clockwise);
        assert_eq!(group.interior_count(), 0);

        let open = r#"{"exterior":{"points":[{"x":0.0,"y":0.0},{"x":10.0,"y":0.0},{"x":10.0,"y":10.0}],"closed":false},"interiors":[]}"#;
        assert!(serde_json::from_str::<RingGroup>(open).is_err());
    }

    #[test]
    fn test_locate_point_respects_holes() {
        let group = RingGroup::new(square(0.0, 0.0, 10.0), vec![square(2.0, 2.0, 2.0)]).unwrap();
        let tol = 0.01;
        assert_eq!(group.locate_point_xy(&Point3d::xy(3.0, 3.0), tol), PointLocation::Outside);
        assert_eq!(group.locate_point_xy(&Point3d::xy(6.0, 6.0), tol), PointLocation::Inside);
        assert_eq!(group.locate_point_xy(&Point3d::xy(4.0, 3.0), tol), PointLocation::OnBoundary);
    }

    #[test]
    fn test_group_rings_assigns_holes_to_smallest_exterior() {
        let big = square(0.0, 0.0, 100.0).reversed();
        let small = square(10.0, 10.0, 30.0).reversed();
        let hole = square(20.0, 20.0, 5.0);
        assert_eq!(big.orientation(), Orientation::Clockwise);
        assert_eq!(hole.orientation(), Orientation::CounterClockwise);

        let groups = group_rings(vec![hole, big, small], 0.01);
        assert_eq!(groups.len(), 2);
        let with_hole: Vec<_> = groups.iter().filter(|g| g.interior_count() == 1).collect();
        assert_eq!(with_hole.len(), 1);
        assert!((with_hole[0].exterior().signed_area_xy() - 900.0).abs() < 1e-9);
    }
}
