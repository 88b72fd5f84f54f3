use serde::{Deserialize, Serialize};

use super::envelope::Envelope;
use super::point::Point3d;
use super::vector::Vec3;

/// A straight segment between two consecutive curve vertices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: Point3d,
    pub end: Point3d,
}

impl Segment {
    pub fn new(start: Point3d, end: Point3d) -> Self {
        Self { start, end }
    }

    pub fn length_xy(&self) -> f64 {
        self.start.distance_xy(&self.end)
    }

    pub fn length_3d(&self) -> f64 {
        self.start.distance_3d(&self.end)
    }

    pub fn is_degenerate(&self, tolerance: f64) -> bool {
        self.length_xy() <= tolerance
    }

    pub fn direction(&self) -> Vec3 {
        self.end - self.start
    }

    pub fn envelope(&self) -> Envelope {
        Envelope::from_points([&self.start, &self.end])
    }

    pub fn reversed(&self) -> Self {
        Self::new(self.end, self.start)
    }

    /// Point at a fractional distance along the segment. Z is interpolated
    /// when both ends define it, otherwise the defined end wins.
    pub fn point_at(&self, factor: f64) -> Point3d {
        let mut p = self.start.lerp(&self.end, factor);
        if !p.has_z() {
            if self.start.has_z() {
                p.z = self.start.z;
            } else if self.end.has_z() {
                p.z = self.end.z;
            }
        }
        p
    }

    /// Unclamped XY projection factor of `point` onto the segment's line.
    /// A degenerate segment reports 0.
    pub fn project_factor(&self, point: &Point3d) -> f64 {
        let d = self.direction();
        let len2 = d.dot_xy(&d);
        if len2 <= 0.0 {
            return 0.0;
        }
        (*point - self.start).dot_xy(&d) / len2
    }

    /// Signed XY distance of `point` to the infinite line through the
    /// segment; positive on the left.
    pub fn signed_line_distance(&self, point: &Point3d) -> f64 {
        let d = self.direction();
        let len = d.length_xy();
        if len <= 0.0 {
            return self.start.distance_xy(point);
        }
        d.cross_xy(&(*point - self.start)) / len
    }

    pub fn closest_factor(&self, point: &Point3d) -> f64 {
        self.project_factor(point).clamp(0.0, 1.0)
    }

    pub fn distance_xy(&self, point: &Point3d) -> f64 {
        let t = self.closest_factor(point);
        self.start.lerp(&self.end, t).distance_xy(point)
    }

    pub fn is_point_on(&self, point: &Point3d, tolerance: f64) -> bool {
        self.envelope().contains_point(point, tolerance) && self.distance_xy(point) <= tolerance
    }

    /// Z of the segment at the XY location closest to `point`, if defined.
    pub fn z_at(&self, point: &Point3d) -> Option<f64> {
        let z = self.point_at(self.closest_factor(point)).z;
        if z.is_nan() { None } else { Some(z) }
    }
}
