//! Intersections of planar rings in space.
//!
//! Two rings in different planes meet along the line shared by their
//! planes. Each ring is flattened into its own plane, the line is clipped
//! to it with the XY engine, and the parameter intervals both rings cover
//! become the result. Rings in one plane are compared entirely in that
//! plane.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{check_tolerance, Result};
use crate::geometry::{Curve, Plane3d, Point3d, PointLocation, Vec3};

use super::operations::{clip_line_xy, intersect_lines_xy};

/// Where the first ring's material lies relative to the second ring's
/// plane. Paths are directed so that this material is on their left, seen
/// from the side the first ring's normal points to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RingPlaneSide {
    /// On the side the other plane's normal points to.
    LeftPositive,
    LeftNegative,
    /// Both rings lie in one plane.
    InPlane,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntersectionPath3D {
    pub path: Curve,
    pub side: RingPlaneSide,
}

/// Where the planes of two rings cross, as far as both rings reach.
/// Parallel planes give nothing; rings in one plane give their shared
/// boundary stretches, marked [`RingPlaneSide::InPlane`].
#[instrument(skip(a, b))]
pub fn intersect_rings_3d(a: &Curve, b: &Curve, tolerance: f64) -> Result<Vec<IntersectionPath3D>> {
    check_tolerance(tolerance)?;
    let a = Facet::new(a)?;
    let b = Facet::new(b)?;

    if a.plane.is_coincident(&b.plane, tolerance) {
        return coplanar_paths(&a, &b, tolerance);
    }
    if a.plane.is_parallel(&b.plane) {
        debug!("parallel planes do not meet");
        return Ok(Vec::new());
    }
    let Some((origin, direction)) = a.plane.intersection_line(&b.plane) else {
        return Ok(Vec::new());
    };
    let line = CuttingLine { origin, direction };

    let shared = intersect_intervals(
        &a.intervals(&line, tolerance)?,
        &b.intervals(&line, tolerance)?,
        tolerance,
    );
    let paths = shared
        .into_iter()
        .map(|(from, to)| oriented_path(&line, from, to, &a, &b.plane, tolerance))
        .collect::<Result<Vec<_>>>()?;
    debug!(paths = paths.len(), "ring intersection complete");
    Ok(paths)
}

/// The pieces of `plane` that lie within `ring`, including boundary
/// segments lying in the plane. A ring lying in the plane is returned
/// whole.
pub fn intersect_ring_with_plane(ring: &Curve, plane: &Plane3d, tolerance: f64) -> Result<Vec<Curve>> {
    check_tolerance(tolerance)?;
    let facet = Facet::new(ring)?;
    if facet.plane.is_coincident(plane, tolerance) {
        return Ok(vec![facet.ring]);
    }
    if facet.plane.is_parallel(plane) {
        return Ok(Vec::new());
    }
    let Some((origin, direction)) = facet.plane.intersection_line(plane) else {
        return Ok(Vec::new());
    };
    let line = CuttingLine { origin, direction };
    facet
        .intervals(&line, tolerance)?
        .into_iter()
        .map(|(from, to)| Curve::open(vec![line.at(from), line.at(to)]))
        .collect()
}

#[derive(Debug, Clone, Copy)]
struct CuttingLine {
    origin: Point3d,
    /// Unit length.
    direction: Vec3,
}

impl CuttingLine {
    fn at(&self, t: f64) -> Point3d {
        self.origin + self.direction * t
    }

    fn parameter(&self, p: &Point3d) -> f64 {
        (*p - self.origin).dot(&self.direction)
    }
}

/// A ring with its plane and its outline in that plane.
#[derive(Debug, Clone)]
struct Facet {
    ring: Curve,
    plane: Plane3d,
    flat: Curve,
}

impl Facet {
    fn new(ring: &Curve) -> Result<Self> {
        let mut ring = ring.clone();
        if !ring.interpolate_undefined_z() {
            for i in 0..ring.point_count() {
                let p = ring.point(i);
                ring.set_point(i, p.with_z(0.0));
            }
        }
        let plane = Plane3d::from_ring(&ring)?;
        let flat = Curve::ring(ring.points().iter().map(|p| flatten(&plane, p)).collect())?;
        Ok(Self { ring, plane, flat })
    }

    fn contains(&self, p: &Point3d) -> bool {
        self.flat.locate_point_xy(&flatten(&self.plane, p), 0.0) == PointLocation::Inside
    }

    /// Parameter ranges along `line` covered by the ring, its boundary
    /// included.
    fn intervals(&self, line: &CuttingLine, tolerance: f64) -> Result<Vec<(f64, f64)>> {
        let (lo, hi) = self
            .ring
            .points()
            .iter()
            .map(|p| line.parameter(p))
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), t| (lo.min(t), hi.max(t)));
        let margin = (hi - lo) * 0.1 + 1.0;
        let (t0, t1) = (lo - margin, hi + margin);
        let start = flatten(&self.plane, &line.at(t0));
        let end = flatten(&self.plane, &line.at(t1));
        let span = end - start;
        let length = span.length_xy();
        let flat_line = Curve::open(vec![start, end])?;

        let parameter = |q: &Point3d| t0 + (*q - start).dot_xy(&span) / length;
        let inside = clip_line_xy(&flat_line, &self.flat, tolerance)?;
        let along = intersect_lines_xy(&flat_line, &self.flat, tolerance)?;
        let pieces: Vec<(f64, f64)> = inside
            .parts()
            .iter()
            .chain(along.parts())
            .map(|c| {
                let (s, e) = (parameter(&c.start_point()), parameter(&c.end_point()));
                (s.min(e), s.max(e))
            })
            .collect();
        Ok(merge_intervals(pieces, tolerance))
    }
}

/// In-plane coordinates, the distance from the plane dropped.
fn flatten(plane: &Plane3d, p: &Point3d) -> Point3d {
    let q = plane.to_plane_coords(p);
    Point3d::xy(q.x, q.y)
}

fn merge_intervals(mut pieces: Vec<(f64, f64)>, tolerance: f64) -> Vec<(f64, f64)> {
    pieces.sort_by(|a, b| a.0.total_cmp(&b.0));
    let mut merged: Vec<(f64, f64)> = Vec::with_capacity(pieces.len());
    for (s, e) in pieces {
        match merged.last_mut() {
            Some(last) if s <= last.1 + tolerance => last.1 = last.1.max(e),
            _ => merged.push((s, e)),
        }
    }
    merged
}

fn intersect_intervals(a: &[(f64, f64)], b: &[(f64, f64)], tolerance: f64) -> Vec<(f64, f64)> {
    let mut shared = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        let from = a[i].0.max(b[j].0);
        let to = a[i].1.min(b[j].1);
        if to - from > tolerance {
            shared.push((from, to));
        }
        if a[i].1 < b[j].1 {
            i += 1;
        } else {
            j += 1;
        }
    }
    shared
}

/// Direct the path so the first ring's material is on its left, then tell
/// which side of the other plane that material is on. Where the first ring
/// extends to both sides of the path, the left side is taken to be the
/// positive one.
fn oriented_path(
    line: &CuttingLine,
    from: f64,
    to: f64,
    facet: &Facet,
    other: &Plane3d,
    tolerance: f64,
) -> Result<IntersectionPath3D> {
    let mid = line.at((from + to) / 2.0);
    let offset = (4.0 * tolerance).max(facet.plane.epsilon());
    let mut left = facet.plane.normal().cross(&line.direction);
    let flip = match (facet.contains(&(mid + left * offset)), facet.contains(&(mid - left * offset))) {
        (true, false) => false,
        (false, true) => true,
        _ => other.signed_distance(&(mid + left * offset)) < 0.0,
    };
    let (start, end) = if flip {
        left = -left;
        (line.at(to), line.at(from))
    } else {
        (line.at(from), line.at(to))
    };
    let side = if other.signed_distance(&(mid + left * offset)) >= 0.0 {
        RingPlaneSide::LeftPositive
    } else {
        RingPlaneSide::LeftNegative
    };
    Ok(IntersectionPath3D {
        path: Curve::open(vec![start, end])?,
        side,
    })
}

fn coplanar_paths(a: &Facet, b: &Facet, tolerance: f64) -> Result<Vec<IntersectionPath3D>> {
    let b_flat = Curve::ring(b.ring.points().iter().map(|p| flatten(&a.plane, p)).collect())?;
    let shared = intersect_lines_xy(&a.flat, &b_flat, tolerance)?;
    let mut paths = Vec::with_capacity(shared.part_count());
    for part in shared.parts() {
        let points: Vec<Point3d> = part.points().iter().map(|p| a.plane.from_plane_coords(p)).collect();
        let path = if part.is_closed() {
            Curve::ring(points)?
        } else {
            Curve::open(points)?
        };
        paths.push(IntersectionPath3D {
            path,
            side: RingPlaneSide::InPlane,
        });
    }
    debug!(paths = paths.len(), "coplanar rings compared");
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const TOL: f64 = 0.01;

    fn horizontal(x0: f64, y0: f64, x1: f64, y1: f64, z: f64) -> Curve {
        Curve::ring(vec![
            Point3d::new(x0, y0, z),
            Point3d::new(x0, y1, z),
            Point3d::new(x1, y1, z),
            Point3d::new(x1, y0, z),
        ])
        .unwrap()
    }

    fn wall_at_x(x: f64, y0: f64, y1: f64, z0: f64, z1: f64) -> Curve {
        Curve::ring(vec![
            Point3d::new(x, y0, z0),
            Point3d::new(x, y1, z0),
            Point3d::new(x, y1, z1),
            Point3d::new(x, y0, z1),
        ])
        .unwrap()
    }

    #[test]
    fn test_coplanar_shared_edge_is_in_plane() {
        let a = horizontal(0.0, 0.0, 10.0, 10.0, 0.0);
        let b = horizontal(10.0, 2.0, 20.0, 8.0, 0.0);
        let paths = intersect_rings_3d(&a, &b, TOL).unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].side, RingPlaneSide::InPlane);
        let flat = intersect_lines_xy(&a, &b, TOL).unwrap();
        assert_relative_eq!(paths[0].path.length_3d(), flat.length_xy(), epsilon = 1e-6);
        assert!(paths[0].path.points().iter().all(|p| p.z.abs() < 1e-6 && (p.x - 10.0).abs() < 1e-6));
    }

    #[test]
    fn test_parallel_planes_do_not_meet() {
        let a = horizontal(0.0, 0.0, 10.0, 10.0, 0.0);
        let b = horizontal(0.0, 0.0, 10.0, 10.0, 5.0);
        assert!(intersect_rings_3d(&a, &b, TOL).unwrap().is_empty());
    }

    #[test]
    fn test_wall_through_floor() {
        let floor = horizontal(0.0, 0.0, 10.0, 10.0, 10.0);
        let wall = wall_at_x(5.0, -5.0, 15.0, 0.0, 20.0);
        let paths = intersect_rings_3d(&floor, &wall, TOL).unwrap();
        assert_eq!(paths.len(), 1);
        assert_relative_eq!(paths[0].path.length_3d(), 10.0, epsilon = 1e-6);
        for p in paths[0].path.points() {
            assert_relative_eq!(p.x, 5.0, epsilon = 1e-6);
            assert_relative_eq!(p.z, 10.0, epsilon = 1e-6);
        }
        // The floor extends to both sides of the wall.
        assert_eq!(paths[0].side, RingPlaneSide::LeftPositive);
    }

    #[test]
    fn test_edge_lying_in_other_plane() {
        let roof = horizontal(0.0, 0.0, 10.0, 10.0, 10.0);
        let wall = wall_at_x(10.0, 0.0, 10.0, 0.0, 10.0);
        let paths = intersect_rings_3d(&roof, &wall, TOL).unwrap();
        assert_eq!(paths.len(), 1);
        assert_relative_eq!(paths[0].path.length_3d(), 10.0, epsilon = 1e-6);

        let wall_plane = Plane3d::from_ring(&wall).unwrap();
        let expected = if wall_plane.signed_distance(&Point3d::new(5.0, 5.0, 10.0)) > 0.0 {
            RingPlaneSide::LeftPositive
        } else {
            RingPlaneSide::LeftNegative
        };
        assert_eq!(paths[0].side, expected);

        // The roof is on the left of the path, seen from its normal.
        let path = &paths[0].path;
        let direction = path.end_point() - path.start_point();
        let roof_normal = Plane3d::from_ring(&roof).unwrap().normal();
        let left = roof_normal.cross(&direction);
        let towards_roof = Point3d::new(5.0, 5.0, 10.0) - path.start_point();
        assert!(left.dot(&towards_roof) > 0.0);
    }

    #[test]
    fn test_ring_against_plane() {
        let ring = horizontal(0.0, 0.0, 10.0, 10.0, 0.0);
        let plane = Plane3d::fit(&[
            Point3d::new(3.0, 0.0, 0.0),
            Point3d::new(3.0, 1.0, 0.0),
            Point3d::new(3.0, 0.0, 1.0),
        ])
        .unwrap();
        let pieces = intersect_ring_with_plane(&ring, &plane, TOL).unwrap();
        assert_eq!(pieces.len(), 1);
        assert_relative_eq!(pieces[0].length_3d(), 10.0, epsilon = 1e-6);

        let level = Plane3d::fit(ring.points()).unwrap();
        assert_eq!(intersect_ring_with_plane(&ring, &level, TOL).unwrap().len(), 1);
    }
}
