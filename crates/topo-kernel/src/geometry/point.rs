use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

use super::vector::Vec3;

/// A point in 3D space whose Z coordinate may be undefined.
///
/// An undefined Z is stored as `NaN` and is never consulted by XY
/// comparisons. Points are plain values: every container owns its own copies.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Point3d {
    pub x: f64,
    pub y: f64,
    #[serde(with = "undefined_z", default = "undefined")]
    pub z: f64,
}

fn undefined() -> f64 {
    f64::NAN
}

/// An undefined Z travels as an absent value, since most formats have no NaN.
mod undefined_z {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(z: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        let value = if z.is_nan() { None } else { Some(*z) };
        value.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }
}

impl Point3d {
    pub const ORIGIN: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// A point without a Z value.
    pub fn xy(x: f64, y: f64) -> Self {
        Self { x, y, z: f64::NAN }
    }

    pub fn has_z(&self) -> bool {
        !self.z.is_nan()
    }

    pub fn with_z(&self, z: f64) -> Self {
        Self { z, ..*self }
    }

    pub fn distance_xy(&self, other: &Self) -> f64 {
        self.distance_squared_xy(other).sqrt()
    }

    pub fn distance_squared_xy(&self, other: &Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// 3D distance; falls back to the XY distance if either Z is undefined.
    pub fn distance_3d(&self, other: &Self) -> f64 {
        if !self.has_z() || !other.has_z() {
            return self.distance_xy(other);
        }
        let dz = self.z - other.z;
        (self.distance_squared_xy(other) + dz * dz).sqrt()
    }

    pub fn equals_xy(&self, other: &Self, tolerance: f64) -> bool {
        self.distance_squared_xy(other) <= tolerance * tolerance
    }

    /// XY equality plus a separate Z check. Two undefined Z values are
    /// equal; a defined and an undefined Z are not.
    pub fn equals_xyz(&self, other: &Self, xy_tolerance: f64, z_tolerance: f64) -> bool {
        if !self.equals_xy(other, xy_tolerance) {
            return false;
        }
        match (self.has_z(), other.has_z()) {
            (true, true) => (self.z - other.z).abs() <= z_tolerance,
            (false, false) => true,
            _ => false,
        }
    }

    pub fn midpoint(&self, other: &Self) -> Self {
        self.lerp(other, 0.5)
    }

    /// Linear interpolation. Z stays undefined unless both ends define it.
    pub fn lerp(&self, other: &Self, t: f64) -> Self {
        Self {
            x: self.x + t * (other.x - self.x),
            y: self.y + t * (other.y - self.y),
            z: self.z + t * (other.z - self.z),
        }
    }

    /// Round X and Y (and a defined Z) to the nearest multiple of `resolution`.
    pub fn snap_to_resolution(&self, resolution: f64) -> Self {
        let snap = |v: f64| (v / resolution).round() * resolution;
        Self {
            x: snap(self.x),
            y: snap(self.y),
            z: if self.has_z() { snap(self.z) } else { self.z },
        }
    }

    /// Lexicographic XY ordering: greater X first, then smaller Y.
    /// Used to find the canonical start of a ring.
    pub fn is_right_bottom_of(&self, other: &Self) -> bool {
        self.x > other.x || (self.x == other.x && self.y < other.y)
    }

    pub fn to_vec3(&self) -> Vec3 {
        Vec3::new(self.x, self.y, if self.has_z() { self.z } else { 0.0 })
    }

    pub fn from_vec3(v: Vec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }

    pub fn to_array(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    pub fn from_array(arr: [f64; 3]) -> Self {
        Self {
            x: arr[0],
            y: arr[1],
            z: arr[2],
        }
    }
}

/// Exact comparison; two undefined Z values compare equal.
impl PartialEq for Point3d {
    fn eq(&self, other: &Self) -> bool {
        self.x == other.x
            && self.y == other.y
            && (self.z == other.z || (self.z.is_nan() && other.z.is_nan()))
    }
}

impl Add<Vec3> for Point3d {
    type Output = Point3d;
    fn add(self, rhs: Vec3) -> Self::Output {
        Point3d::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Point3d {
    type Output = Vec3;
    /// Difference vector. An undefined Z on either side yields a zero Z
    /// component so the XY part stays usable.
    fn sub(self, rhs: Self) -> Self::Output {
        let dz = if self.has_z() && rhs.has_z() {
            self.z - rhs.z
        } else {
            0.0
        };
        Vec3::new(self.x - rhs.x, self.y - rhs.y, dz)
    }
}

impl Sub<Vec3> for Point3d {
    type Output = Point3d;
    fn sub(self, rhs: Vec3) -> Self::Output {
        Point3d::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undefined_z_serializes_as_null() {
        let json = serde_json::to_string(&Point3d::xy(1.0, 2.0)).unwrap();
        assert_eq!(json, r#"{"x":1.0,"y":2.0,"z":null}"#);
        let back: Point3d = serde_json::from_str(r#"{"x":1.0,"y":2.0}"#).unwrap();
        assert!(!back.has_z());
        let with_z: Point3d = serde_json::from_str(r#"{"x":1.0,"y":2.0,"z":3.5}"#).unwrap();
        assert_eq!(with_z, Point3d::new(1.0, 2.0, 3.5));
    }

    #[test]
    fn test_distance_ignores_undefined_z() {
        let a = Point3d::xy(0.0, 0.0);
        let b = Point3d::new(3.0, 4.0, 100.0);
        assert!((a.distance_3d(&b) - 5.0).abs() < 1e-12);
        assert!((a.distance_xy(&b) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_equals_xy_and_xyz() {
        let a = Point3d::new(1.0, 1.0, 10.0);
        let b = Point3d::new(1.005, 1.0, 10.5);
        assert!(a.equals_xy(&b, 0.01));
        assert!(!a.equals_xyz(&b, 0.01, 0.1));
        assert!(a.equals_xyz(&b, 0.01, 1.0));

        let c = Point3d::xy(1.0, 1.0);
        assert!(a.equals_xy(&c, 0.0));
        assert!(!a.equals_xyz(&c, 0.01, 1.0));
        assert!(c.equals_xyz(&Point3d::xy(1.0, 1.0), 0.01, 0.01));
    }

    #[test]
    fn test_lerp_keeps_undefined_z() {
        let a = Point3d::xy(0.0, 0.0);
        let b = Point3d::new(10.0, 0.0, 5.0);
        let m = a.lerp(&b, 0.5);
        assert!((m.x - 5.0).abs() < 1e-12);
        assert!(!m.has_z());

        let c = Point3d::new(0.0, 0.0, 1.0);
        assert!((c.lerp(&b, 0.5).z - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_snap_to_resolution() {
        let p = Point3d::new(1.23456, -7.891, 0.004).snap_to_resolution(0.01);
        assert!((p.x - 1.23).abs() < 1e-12);
        assert!((p.y + 7.89).abs() < 1e-12);
        assert!(p.z.abs() < 1e-12);
    }

    #[test]
    fn test_right_bottom_ordering() {
        let a = Point3d::xy(5.0, 0.0);
        let b = Point3d::xy(5.0, 1.0);
        let c = Point3d::xy(4.0, -10.0);
        assert!(a.is_right_bottom_of(&b));
        assert!(b.is_right_bottom_of(&c));
        assert!(!c.is_right_bottom_of(&a));
    }
}
