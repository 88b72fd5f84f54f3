use serde::{Deserialize, Serialize};
use tracing::debug;

use super::envelope::Envelope;
use super::point::Point3d;

/// An unordered bag of points.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MultiPoint {
    points: Vec<Point3d>,
}

impl MultiPoint {
    pub fn new(points: Vec<Point3d>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Point3d] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn push(&mut self, point: Point3d) {
        self.points.push(point);
    }

    pub fn envelope(&self) -> Envelope {
        Envelope::from_points(&self.points)
    }

    /// Merge points within `xy_tolerance` of each other (transitively) into
    /// their centroid. Returns the number of eliminated points.
    pub fn cluster_xy(&mut self, xy_tolerance: f64) -> usize {
        self.cluster(xy_tolerance, None)
    }

    /// Like [`MultiPoint::cluster_xy`], but points whose defined Z values
    /// differ by more than `z_tolerance` stay apart. An undefined Z never
    /// separates points.
    pub fn cluster_xyz(&mut self, xy_tolerance: f64, z_tolerance: f64) -> usize {
        self.cluster(xy_tolerance, Some(z_tolerance))
    }

    fn cluster(&mut self, xy_tolerance: f64, z_tolerance: Option<f64>) -> usize {
        let before = self.points.len();
        let clusters = cluster_indices(&self.points, xy_tolerance, z_tolerance);

        let mut merged: Vec<Point3d> = clusters
            .iter()
            .map(|members| centroid(members.iter().map(|&i| &self.points[i])))
            .collect();
        merged.sort_by(|a, b| {
            a.x.total_cmp(&b.x)
                .then(a.y.total_cmp(&b.y))
                .then(a.z.total_cmp(&b.z))
        });

        self.points = merged;
        let eliminated = before - self.points.len();
        debug!(before, after = self.points.len(), eliminated, "point clustering complete");
        eliminated
    }
}

/// Connected components of the "within tolerance" relation. The result does
/// not depend on input order: components are listed by smallest member.
pub(crate) fn cluster_indices(
    points: &[Point3d],
    xy_tolerance: f64,
    z_tolerance: Option<f64>,
) -> Vec<Vec<usize>> {
    let n = points.len();
    let mut parent: Vec<usize> = (0..n).collect();

    fn find(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    let mut by_x: Vec<usize> = (0..n).collect();
    by_x.sort_by(|&a, &b| points[a].x.total_cmp(&points[b].x));

    for (k, &i) in by_x.iter().enumerate() {
        for &j in &by_x[k + 1..] {
            if points[j].x - points[i].x > xy_tolerance {
                break;
            }
            if !points[i].equals_xy(&points[j], xy_tolerance) {
                continue;
            }
            if let Some(z_tol) = z_tolerance {
                let (a, b) = (points[i], points[j]);
                if a.has_z() && b.has_z() && (a.z - b.z).abs() > z_tol {
                    continue;
                }
            }
            let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
            if ri != rj {
                parent[ri.max(rj)] = ri.min(rj);
            }
        }
    }

    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut slot: Vec<Option<usize>> = vec![None; n];
    for i in 0..n {
        let root = find(&mut parent, i);
        match slot[root] {
            Some(g) => groups[g].push(i),
            None => {
                slot[root] = Some(groups.len());
                groups.push(vec![i]);
            }
        }
    }
    groups
}

/// Mean position; Z is the mean of the defined Z values, if any.
pub(crate) fn centroid<'a>(points: impl IntoIterator<Item = &'a Point3d>) -> Point3d {
    let (mut sx, mut sy, mut sz) = (0.0, 0.0, 0.0);
    let (mut n, mut nz) = (0usize, 0usize);
    for p in points {
        sx += p.x;
        sy += p.y;
        n += 1;
        if p.has_z() {
            sz += p.z;
            nz += 1;
        }
    }
    let n = n.max(1) as f64;
    let z = if nz > 0 { sz / nz as f64 } else { f64::NAN };
    Point3d::new(sx / n, sy / n, z)
}
