use nalgebra::{Matrix3, SymmetricEigen, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TopologyError};

use super::curve::Curve;
use super::point::Point3d;
use super::vector::Vec3;

/// |normal.z| below this makes a plane vertical.
const VERTICAL_NORMAL_Z: f64 = 1e-9;
/// Angular slack (as 1 - |cos|) for treating two normals as parallel.
const PARALLEL_COS_EPSILON: f64 = 1e-9;

/// A plane `a·x + b·y + c·z + d = 0` with unit normal `(a, b, c)`, fitted by
/// least squares.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plane3d {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    centroid: Point3d,
    epsilon: f64,
}

impl Plane3d {
    /// Least-squares plane through all `points` (undefined Z counts as 0).
    /// The normal points upwards, or towards +X/+Y for vertical planes.
    pub fn fit(points: &[Point3d]) -> Result<Self> {
        let mut plane = Self::fit_unoriented(points)?;
        let n = plane.normal();
        let flip = if n.z.abs() > VERTICAL_NORMAL_Z {
            n.z < 0.0
        } else if n.x.abs() > VERTICAL_NORMAL_Z {
            n.x < 0.0
        } else {
            n.y < 0.0
        };
        if flip {
            plane = plane.flipped();
        }
        Ok(plane)
    }

    /// Plane through a ring. The normal follows the winding: a ring that is
    /// clockwise seen from above gets a downward normal.
    pub fn from_ring(ring: &Curve) -> Result<Self> {
        let mut plane = Self::fit_unoriented(ring.points())?;
        if plane.normal().dot(&newell_normal(ring.points())) < 0.0 {
            plane = plane.flipped();
        }
        Ok(plane)
    }

    fn fit_unoriented(points: &[Point3d]) -> Result<Self> {
        if points.len() < 3 {
            return Err(TopologyError::TooFewPoints {
                required: 3,
                actual: points.len(),
            });
        }
        let n = points.len() as f64;
        let vs: Vec<Vector3<f64>> = points
            .iter()
            .map(|p| {
                let v = p.to_vec3();
                Vector3::new(v.x, v.y, v.z)
            })
            .collect();
        let centre = vs.iter().fold(Vector3::<f64>::zeros(), |acc, v| acc + v) / n;

        let mut cov = Matrix3::<f64>::zeros();
        for v in &vs {
            let r = v - centre;
            cov += r * r.transpose();
        }

        let eigen = SymmetricEigen::new(cov);
        let mut order = [0usize, 1, 2];
        order.sort_by(|&i, &j| eigen.eigenvalues[i].total_cmp(&eigen.eigenvalues[j]));
        let (middle, largest) = (eigen.eigenvalues[order[1]], eigen.eigenvalues[order[2]]);
        if largest <= f64::MIN_POSITIVE || middle <= largest * 1e-12 {
            return Err(TopologyError::UndefinedPlane);
        }

        let normal = eigen.eigenvectors.column(order[0]).normalize();
        let (a, b, c) = (normal[0], normal[1], normal[2]);
        let d = -(a * centre[0] + b * centre[1] + c * centre[2]);

        let max_coord = vs
            .iter()
            .flat_map(|v| v.iter().map(|c| c.abs()))
            .fold(0.0_f64, f64::max);

        Ok(Self {
            a,
            b,
            c,
            d,
            centroid: Point3d::new(centre[0], centre[1], centre[2]),
            epsilon: max_coord.max(1.0) * 1e-12,
        })
    }

    fn flipped(&self) -> Self {
        Self {
            a: -self.a,
            b: -self.b,
            c: -self.c,
            d: -self.d,
            ..*self
        }
    }

    pub fn normal(&self) -> Vec3 {
        Vec3::new(self.a, self.b, self.c)
    }

    pub fn centroid(&self) -> Point3d {
        self.centroid
    }

    /// Numeric noise level for distances, scaled to the fitted coordinates.
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn signed_distance(&self, p: &Point3d) -> f64 {
        let v = p.to_vec3();
        self.a * v.x + self.b * v.y + self.c * v.z + self.d
    }

    pub fn is_vertical(&self) -> bool {
        self.c.abs() < VERTICAL_NORMAL_Z
    }

    /// Z of the plane above `(x, y)`. Vertical planes have no such value.
    pub fn z_at(&self, x: f64, y: f64) -> Result<f64> {
        if self.is_vertical() {
            return Err(TopologyError::VerticalPlane { x, y });
        }
        Ok(-(self.a * x + self.b * y + self.d) / self.c)
    }

    /// Same normal direction (or opposite), regardless of offset.
    pub fn is_parallel(&self, other: &Self) -> bool {
        approx::abs_diff_eq!(
            self.normal().dot(&other.normal()).abs(),
            1.0,
            epsilon = PARALLEL_COS_EPSILON
        )
    }

    /// Same plane within `tolerance`, with either normal direction.
    pub fn is_coincident(&self, other: &Self, tolerance: f64) -> bool {
        let tol = tolerance.max(self.epsilon).max(other.epsilon);
        self.is_parallel(other)
            && self.signed_distance(&other.centroid).abs() <= tol
            && other.signed_distance(&self.centroid).abs() <= tol
    }

    /// Line shared by two non-parallel planes, as a point and a unit direction.
    pub fn intersection_line(&self, other: &Self) -> Option<(Point3d, Vec3)> {
        let (n1, n2) = (self.normal(), other.normal());
        let u = n1.cross(&n2);
        let len2 = u.dot(&u);
        if len2 < PARALLEL_COS_EPSILON * PARALLEL_COS_EPSILON {
            return None;
        }
        let (h1, h2) = (-self.d, -other.d);
        let p = (n2.cross(&u) * h1 + u.cross(&n1) * h2) / len2;
        Some((Point3d::from_vec3(p), u / len2.sqrt()))
    }

    pub fn project(&self, p: &Point3d) -> Point3d {
        let dist = self.signed_distance(p);
        Point3d::from_vec3(p.to_vec3() - self.normal() * dist)
    }

    /// Orthonormal in-plane axes `(u, v)` with `u × v = normal`.
    pub fn axes(&self) -> (Vec3, Vec3) {
        let n = self.normal();
        let seed = if n.x.abs() < 0.9 {
            Vec3::new(1.0, 0.0, 0.0)
        } else {
            Vec3::new(0.0, 1.0, 0.0)
        };
        let u = seed.cross(&n);
        let u = u / u.length();
        (u, n.cross(&u))
    }

    /// Express a point in the plane frame: X/Y are the in-plane
    /// coordinates, Z the signed distance.
    pub fn to_plane_coords(&self, p: &Point3d) -> Point3d {
        let (u, v) = self.axes();
        let r = p.to_vec3() - self.centroid.to_vec3();
        Point3d::new(r.dot(&u), r.dot(&v), r.dot(&self.normal()))
    }

    pub fn from_plane_coords(&self, p: &Point3d) -> Point3d {
        let (u, v) = self.axes();
        let w = if p.has_z() { p.z } else { 0.0 };
        Point3d::from_vec3(self.centroid.to_vec3() + u * p.x + v * p.y + self.normal() * w)
    }
}

/// Newell's area-weighted normal; its Z is twice the counter-clockwise area.
pub(crate) fn newell_normal(points: &[Point3d]) -> Vec3 {
    let n = points.len();
    let mut normal = Vec3::ZERO;
    for i in 0..n {
        let a = points[i].to_vec3();
        let b = points[(i + 1) % n].to_vec3();
        normal.x += (a.y - b.y) * (a.z + b.z);
        normal.y += (a.z - b.z) * (a.x + b.x);
        normal.z += (a.x - b.x) * (a.y + b.y);
    }
    normal
}
