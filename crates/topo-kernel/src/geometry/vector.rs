use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Neg, Sub};

/// A vector in 3D space. Most of the engine only looks at the XY part.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };
    pub const Z: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 1.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(&self, other: &Self) -> Self {
        Self {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    pub fn length(&self) -> f64 {
        self.dot(self).sqrt()
    }

    pub fn length_xy(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn dot_xy(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Z component of the cross product of the XY parts. Positive when
    /// `other` lies counter-clockwise of `self`.
    pub fn cross_xy(&self, other: &Self) -> f64 {
        self.x * other.y - self.y * other.x
    }

    /// Angle of the XY part in `[0, 2π)`.
    pub fn angle_xy(&self) -> f64 {
        let a = self.y.atan2(self.x);
        if a < 0.0 { a + std::f64::consts::TAU } else { a }
    }

    pub fn normalized(&self) -> Option<Self> {
        let len = self.length();
        if len < 1e-15 { None } else { Some(*self / len) }
    }

    pub fn is_parallel_to(&self, other: &Self, angular_tol: f64) -> bool {
        let len_product = self.length() * other.length();
        if len_product < 1e-30 {
            return false;
        }
        let cos = (self.dot(other) / len_product).clamp(-1.0, 1.0);
        let angle = cos.acos();
        angle < angular_tol || (std::f64::consts::PI - angle) < angular_tol
    }
}

impl Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self::Output {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Div<f64> for Vec3 {
    type Output = Self;
    fn div(self, rhs: f64) -> Self::Output {
        Self::new(self.x / rhs, self.y / rhs, self.z / rhs)
    }
}

impl Neg for Vec3 {
    type Output = Self;
    fn neg(self) -> Self::Output {
        Self::new(-self.x, -self.y, -self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_cross_xy_sign() {
        let east = Vec3::new(1.0, 0.0, 0.0);
        let north = Vec3::new(0.0, 1.0, 0.0);
        assert!(east.cross_xy(&north) > 0.0);
        assert!(north.cross_xy(&east) < 0.0);
    }

    #[test]
    fn test_angle_xy_range() {
        assert!((Vec3::new(0.0, 1.0, 0.0).angle_xy() - FRAC_PI_2).abs() < 1e-12);
        assert!((Vec3::new(-1.0, 0.0, 0.0).angle_xy() - PI).abs() < 1e-12);
        assert!((Vec3::new(0.0, -1.0, 0.0).angle_xy() - 3.0 * FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn test_parallel() {
        let x = Vec3::new(1.0, 0.0, 0.0);
        assert!(x.is_parallel_to(&(x * 5.0), 1e-10));
        assert!(x.is_parallel_to(&(-x), 1e-10));
        assert!(!x.is_parallel_to(&Vec3::Z, 1e-10));
        assert!(Vec3::ZERO.normalized().is_none());
    }
}
