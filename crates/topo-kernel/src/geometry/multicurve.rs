use serde::{Deserialize, Serialize};

use super::curve::{Curve, Orientation, PointLocation};
use super::envelope::Envelope;
use super::point::Point3d;
use super::ring_group::{group_rings, RingGroup};

/// An ordered collection of curves or rings. For rings, clockwise parts add
/// area and counter-clockwise parts (holes) subtract it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MultiCurve {
    parts: Vec<Curve>,
}

impl MultiCurve {
    pub fn new(parts: Vec<Curve>) -> Self {
        Self { parts }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_ring_groups<'a>(groups: impl IntoIterator<Item = &'a RingGroup>) -> Self {
        Self::new(
            groups
                .into_iter()
                .flat_map(|g| g.rings().cloned())
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    pub fn part(&self, index: usize) -> &Curve {
        &self.parts[index]
    }

    pub fn parts(&self) -> &[Curve] {
        &self.parts
    }

    pub fn into_parts(self) -> Vec<Curve> {
        self.parts
    }

    pub fn push(&mut self, part: Curve) {
        self.parts.push(part);
    }

    pub fn extend(&mut self, other: MultiCurve) {
        self.parts.extend(other.parts);
    }

    pub fn is_closed(&self) -> bool {
        !self.parts.is_empty() && self.parts.iter().all(Curve::is_closed)
    }

    pub fn area_xy(&self) -> f64 {
        self.parts.iter().map(Curve::signed_area_xy).sum()
    }

    pub fn length_xy(&self) -> f64 {
        self.parts.iter().map(Curve::length_xy).sum()
    }

    pub fn length_3d(&self) -> f64 {
        self.parts.iter().map(Curve::length_3d).sum()
    }

    pub fn point_count(&self) -> usize {
        self.parts.iter().map(Curve::point_count).sum()
    }

    pub fn envelope(&self) -> Envelope {
        self.parts
            .iter()
            .fold(Envelope::empty(), |env, p| env.union(&p.envelope()))
    }

    pub fn reverse_all(&mut self) {
        for part in &mut self.parts {
            part.reverse();
        }
    }

    pub fn exterior_rings(&self) -> impl Iterator<Item = &Curve> {
        self.parts
            .iter()
            .filter(|p| p.orientation() == Orientation::Clockwise)
    }

    pub fn interior_rings(&self) -> impl Iterator<Item = &Curve> {
        self.parts
            .iter()
            .filter(|p| p.orientation() == Orientation::CounterClockwise)
    }

    /// Locate a point against the area bounded by all ring parts, with holes
    /// removed (even-odd over every part).
    pub fn locate_point_xy(&self, point: &Point3d, tolerance: f64) -> PointLocation {
        let mut inside = false;
        for ring in self.parts.iter().filter(|p| p.is_closed()) {
            match ring.locate_point_xy(point, tolerance) {
                PointLocation::OnBoundary => return PointLocation::OnBoundary,
                PointLocation::Inside => inside = !inside,
                PointLocation::Outside => {}
            }
        }
        if inside {
            PointLocation::Inside
        } else {
            PointLocation::Outside
        }
    }

    /// Group the ring parts into polygons (holes into their containing
    /// exterior).
    pub fn to_ring_groups(&self, tolerance: f64) -> Vec<RingGroup> {
        group_rings(self.parts.clone(), tolerance)
    }
}

impl From<Curve> for MultiCurve {
    fn from(curve: Curve) -> Self {
        Self::new(vec![curve])
    }
}

impl From<RingGroup> for MultiCurve {
    fn from(group: RingGroup) -> Self {
        group.into_multicurve()
    }
}
