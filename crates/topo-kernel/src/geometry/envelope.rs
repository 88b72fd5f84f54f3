use serde::{Deserialize, Serialize};

use super::point::Point3d;

/// Axis-aligned XY extent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl Envelope {
    pub fn empty() -> Self {
        Self {
            x_min: f64::INFINITY,
            y_min: f64::INFINITY,
            x_max: f64::NEG_INFINITY,
            y_max: f64::NEG_INFINITY,
        }
    }

    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3d>) -> Self {
        let mut env = Self::empty();
        for p in points {
            env.expand_to_include(p);
        }
        env
    }

    pub fn is_empty(&self) -> bool {
        self.x_min > self.x_max || self.y_min > self.y_max
    }

    pub fn expand_to_include(&mut self, p: &Point3d) {
        self.x_min = self.x_min.min(p.x);
        self.y_min = self.y_min.min(p.y);
        self.x_max = self.x_max.max(p.x);
        self.y_max = self.y_max.max(p.y);
    }

    pub fn union(&self, other: &Self) -> Self {
        Self {
            x_min: self.x_min.min(other.x_min),
            y_min: self.y_min.min(other.y_min),
            x_max: self.x_max.max(other.x_max),
            y_max: self.y_max.max(other.y_max),
        }
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    /// Overlap test where extents closer than `tolerance` still count.
    pub fn intersects(&self, other: &Self, tolerance: f64) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.x_min <= other.x_max + tolerance
            && other.x_min <= self.x_max + tolerance
            && self.y_min <= other.y_max + tolerance
            && other.y_min <= self.y_max + tolerance
    }

    pub fn contains_point(&self, p: &Point3d, tolerance: f64) -> bool {
        p.x >= self.x_min - tolerance
            && p.x <= self.x_max + tolerance
            && p.y >= self.y_min - tolerance
            && p.y <= self.y_max + tolerance
    }

    /// True if `other` lies within this envelope (grown by `tolerance`).
    pub fn contains(&self, other: &Self, tolerance: f64) -> bool {
        other.x_min >= self.x_min - tolerance
            && other.x_max <= self.x_max + tolerance
            && other.y_min >= self.y_min - tolerance
            && other.y_max <= self.y_max + tolerance
    }

    /// Largest absolute coordinate, used to scale numeric epsilons.
    pub fn max_abs_coordinate(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.x_min
            .abs()
            .max(self.x_max.abs())
            .max(self.y_min.abs())
            .max(self.y_max.abs())
    }
}
