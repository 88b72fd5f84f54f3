//! The capability set shared by every container that takes part in the
//! topological operations.
//!
//! Algorithms are written once against [`Linear`]; [`Shape`] selects the
//! concrete container by variant.

use serde::{Deserialize, Serialize};

use super::curve::Curve;
use super::envelope::Envelope;
use super::multicurve::MultiCurve;
use super::point::Point3d;
use super::ring_group::RingGroup;

/// Read access to the parts of a curve-like container.
pub trait Linear {
    fn part_count(&self) -> usize;

    fn part(&self, index: usize) -> &Curve;

    fn area_xy(&self) -> f64 {
        (0..self.part_count())
            .map(|i| self.part(i).signed_area_xy())
            .sum()
    }

    fn length_xy(&self) -> f64 {
        (0..self.part_count()).map(|i| self.part(i).length_xy()).sum()
    }

    fn point_count(&self) -> usize {
        (0..self.part_count())
            .map(|i| self.part(i).point_count())
            .sum()
    }

    /// Point by its index over all parts, in part order.
    fn point(&self, global_index: usize) -> Option<Point3d> {
        let mut remaining = global_index;
        for i in 0..self.part_count() {
            let part = self.part(i);
            if remaining < part.point_count() {
                return Some(part.point(remaining));
            }
            remaining -= part.point_count();
        }
        None
    }

    fn envelope(&self) -> Envelope {
        (0..self.part_count()).fold(Envelope::empty(), |env, i| {
            env.union(&self.part(i).envelope())
        })
    }

    /// True if every part is a ring.
    fn is_area(&self) -> bool {
        self.part_count() > 0 && (0..self.part_count()).all(|i| self.part(i).is_closed())
    }

    fn to_multicurve(&self) -> MultiCurve {
        MultiCurve::new((0..self.part_count()).map(|i| self.part(i).clone()).collect())
    }
}

impl Linear for Curve {
    fn part_count(&self) -> usize {
        1
    }

    fn part(&self, index: usize) -> &Curve {
        debug_assert_eq!(index, 0);
        self
    }
}

impl Linear for MultiCurve {
    fn part_count(&self) -> usize {
        MultiCurve::part_count(self)
    }

    fn part(&self, index: usize) -> &Curve {
        MultiCurve::part(self, index)
    }
}

impl Linear for RingGroup {
    fn part_count(&self) -> usize {
        1 + self.interior_count()
    }

    fn part(&self, index: usize) -> &Curve {
        if index == 0 {
            self.exterior()
        } else {
            &self.interiors()[index - 1]
        }
    }
}

/// Any of the three container kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Curve(Curve),
    MultiCurve(MultiCurve),
    RingGroup(RingGroup),
}

impl Linear for Shape {
    fn part_count(&self) -> usize {
        match self {
            Shape::Curve(c) => Linear::part_count(c),
            Shape::MultiCurve(m) => Linear::part_count(m),
            Shape::RingGroup(g) => Linear::part_count(g),
        }
    }

    fn part(&self, index: usize) -> &Curve {
        match self {
            Shape::Curve(c) => Linear::part(c, index),
            Shape::MultiCurve(m) => Linear::part(m, index),
            Shape::RingGroup(g) => Linear::part(g, index),
        }
    }
}

impl From<Curve> for Shape {
    fn from(c: Curve) -> Self {
        Shape::Curve(c)
    }
}

impl From<MultiCurve> for Shape {
    fn from(m: MultiCurve) -> Self {
        Shape::MultiCurve(m)
    }
}

impl From<RingGroup> for Shape {
    fn from(g: RingGroup) -> Self {
        Shape::RingGroup(g)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_variants_share_capabilities() {
        let ring = Curve::ring_xy(&[(0.0, 0.0), (0.0, 2.0), (2.0, 2.0), (2.0, 0.0)]).unwrap();
        let group = RingGroup::from_exterior(ring.clone()).unwrap();
        let shapes = [
            Shape::from(ring.clone()),
            Shape::from(MultiCurve::from(ring)),
            Shape::from(group),
        ];
        for shape in &shapes {
            assert_eq!(shape.part_count(), 1);
            assert!((shape.area_xy() - 4.0).abs() < 1e-12);
            assert!((shape.length_xy() - 8.0).abs() < 1e-12);
            assert_eq!(shape.point_count(), 4);
            assert_eq!(shape.point(2), Some(Point3d::xy(2.0, 2.0)));
            assert_eq!(shape.point(4), None);
            assert!(shape.is_area());
        }
    }
}
