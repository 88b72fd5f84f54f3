//! Cleaning rings whose boundary runs back along itself.
//!
//! Spikes (the boundary goes out and returns on the same line) are cut off
//! vertex by vertex. Pinches, where two stretches of the boundary lie on
//! top of each other, are noded with the ring's own intersection points
//! and split there; the zero-width stretches between the pieces vanish.

use tracing::{debug, instrument};

use crate::error::{check_tolerance, Result, TopologyError};
use crate::geometry::{Curve, Point3d, Segment};

use super::assembly::split_at_touches;
use super::intersection::{DetectorFlags, IntersectionDetector, IntersectionPoint3D};
use super::{normalize_virtual_vertex, vertex_at};

/// Split `ring` into simple rings, removing spikes and pinched stretches.
///
/// Vertices closer than `max(tolerance, min_segment_length)` are merged.
/// Pieces without area are dropped, so the result may be empty.
#[instrument(skip(ring), fields(points = ring.point_count()))]
pub fn remove_linear_self_intersections(
    ring: &Curve,
    tolerance: f64,
    min_segment_length: f64,
) -> Result<Vec<Curve>> {
    check_tolerance(tolerance)?;
    check_tolerance(min_segment_length)?;
    if !ring.is_closed() {
        return Err(TopologyError::NotClosed);
    }
    let merge = tolerance.max(min_segment_length);

    let mut points = ring.points().to_vec();
    dedupe(&mut points, merge);
    let spikes = remove_spikes(&mut points, tolerance);
    let Ok(cleaned) = Curve::ring(points) else {
        debug!(spikes, "ring collapsed to a line");
        return Ok(Vec::new());
    };

    let detector = IntersectionDetector::new(tolerance)?.with_flags(DetectorFlags {
        linear_intermediates: true,
        ..DetectorFlags::default()
    });
    let touches = detector.find_self_intersections(&cleaned);
    let noded = Curve::ring(insert_touch_points(&cleaned, &touches, tolerance))?;

    let rings: Vec<Curve> = split_at_touches(noded, &[], tolerance)
        .into_iter()
        .filter_map(|piece| {
            let mut points = piece.into_points();
            remove_spikes(&mut points, tolerance);
            dedupe(&mut points, merge);
            let ring = Curve::ring(points).ok()?;
            (!ring.is_degenerate_ring(tolerance)).then_some(ring)
        })
        .collect();
    debug!(spikes, touches = touches.len(), rings = rings.len(), "linear self intersections removed");
    Ok(rings)
}

/// Merge consecutive vertices, the closing pair included.
fn dedupe(points: &mut Vec<Point3d>, tolerance: f64) {
    points.dedup_by(|later, earlier| later.equals_xy(earlier, tolerance));
    while points.len() > 1 && points[points.len() - 1].equals_xy(&points[0], tolerance) {
        points.pop();
    }
}

fn is_spike(prev: &Point3d, apex: &Point3d, next: &Point3d, tolerance: f64) -> bool {
    let out = *apex - *prev;
    let back = *next - *apex;
    if out.length_xy() <= tolerance || back.length_xy() <= tolerance || out.dot_xy(&back) >= 0.0 {
        return false;
    }
    Segment::new(*prev, *apex).distance_xy(next) <= tolerance
        || Segment::new(*apex, *next).distance_xy(prev) <= tolerance
}

/// Remove spike apexes until none is left. Returns the number removed.
fn remove_spikes(points: &mut Vec<Point3d>, tolerance: f64) -> usize {
    let mut removed = 0;
    while points.len() >= 3 {
        let n = points.len();
        let apex = (0..n).find(|&i| {
            is_spike(&points[(i + n - 1) % n], &points[i], &points[(i + 1) % n], tolerance)
        });
        let Some(i) = apex else {
            break;
        };
        points.remove(i);
        dedupe(points, tolerance);
        removed += 1;
    }
    removed
}

/// The ring's vertices with every self-intersection added as a vertex on
/// both stretches it joins.
fn insert_touch_points(ring: &Curve, touches: &[IntersectionPoint3D], tolerance: f64) -> Vec<Point3d> {
    let n = ring.point_count();
    let mut inserts: Vec<Vec<(f64, Point3d)>> = vec![Vec::new(); n];
    for record in touches {
        for virtual_vertex in [record.virtual_source_vertex, record.virtual_target_vertex] {
            let virtual_vertex = normalize_virtual_vertex(virtual_vertex, ring);
            if vertex_at(virtual_vertex, ring).is_some() {
                continue;
            }
            let index = (virtual_vertex.floor() as usize).min(n - 1);
            let segment = ring.segment(index);
            if segment.start.equals_xy(&record.point, tolerance)
                || segment.end.equals_xy(&record.point, tolerance)
            {
                continue;
            }
            inserts[index].push((virtual_vertex - index as f64, record.point));
        }
    }

    let mut points = Vec::with_capacity(n + 2 * touches.len());
    for (i, mut extra) in inserts.into_iter().enumerate() {
        points.push(ring.point(i));
        extra.sort_by(|a, b| a.0.total_cmp(&b.0));
        points.extend(extra.into_iter().map(|(_, p)| p));
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const TOL: f64 = 0.01;

    fn areas(rings: &[Curve]) -> Vec<f64> {
        let mut areas: Vec<f64> = rings.iter().map(|r| r.signed_area_xy()).collect();
        areas.sort_by(f64::total_cmp);
        areas
    }

    #[test]
    fn test_straight_pinch_splits_in_two() {
        // Two squares joined by a corridor travelled both ways.
        let ring = Curve::ring_xy(&[
            (0.0, 0.0),
            (0.0, 10.0),
            (10.0, 10.0),
            (10.0, 5.0),
            (20.0, 5.0),
            (20.0, 10.0),
            (30.0, 10.0),
            (30.0, 0.0),
            (20.0, 0.0),
            (20.0, 5.0),
            (10.0, 5.0),
            (10.0, 0.0),
        ])
        .unwrap();
        let rings = remove_linear_self_intersections(&ring, TOL, 0.0).unwrap();
        assert_eq!(areas(&rings), vec![100.0, 100.0]);
        let total: f64 = rings.iter().map(|r| r.signed_area_xy()).sum();
        assert_relative_eq!(total, ring.signed_area_xy());
    }

    #[test]
    fn test_zig_zag_pinch_within_tolerance() {
        let ring = Curve::ring_xy(&[
            (0.0, 0.0),
            (0.0, 10.0),
            (10.0, 10.0),
            (10.0, 5.005),
            (12.0, 5.004),
            (20.0, 5.005),
            (20.0, 10.0),
            (30.0, 10.0),
            (30.0, 0.0),
            (20.0, 0.0),
            (20.0, 5.0),
            (15.0, 5.0),
            (10.0, 5.0),
            (10.0, 0.0),
        ])
        .unwrap();
        let rings = remove_linear_self_intersections(&ring, TOL, 0.0).unwrap();
        assert_eq!(rings.len(), 2);
        for area in areas(&rings) {
            assert_relative_eq!(area, 100.0, epsilon = 0.1);
        }
    }

    #[test]
    fn test_spike_returning_to_its_base() {
        let ring = Curve::ring_xy(&[
            (0.0, 0.0),
            (0.0, 10.0),
            (5.0, 10.0),
            (5.0, 15.0),
            (5.0, 10.0),
            (10.0, 10.0),
            (10.0, 0.0),
        ])
        .unwrap();
        let rings = remove_linear_self_intersections(&ring, TOL, 0.0).unwrap();
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].signed_area_xy(), 100.0);
        assert!(rings[0].points().iter().all(|p| p.y <= 10.0));
    }

    #[test]
    fn test_single_point_spike() {
        let ring = Curve::ring_xy(&[(0.0, 0.0), (0.0, 10.0), (10.0, 10.0), (10.0, 0.0), (15.0, 0.0)]).unwrap();
        let rings = remove_linear_self_intersections(&ring, TOL, 0.0).unwrap();
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].point_count(), 4);
        assert_eq!(rings[0].signed_area_xy(), 100.0);
    }

    #[test]
    fn test_zig_zag_along_an_edge() {
        let ring = Curve::ring_xy(&[
            (0.0, 0.0),
            (0.0, 10.0),
            (3.0, 10.0),
            (8.0, 10.0),
            (6.0, 10.0),
            (10.0, 10.0),
            (10.0, 0.0),
        ])
        .unwrap();
        let rings = remove_linear_self_intersections(&ring, TOL, 0.0).unwrap();
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].signed_area_xy(), 100.0);
        assert!(!rings[0].points().contains(&Point3d::xy(8.0, 10.0)));
    }

    #[test]
    fn test_min_segment_length_drops_short_edges() {
        let ring = Curve::ring_xy(&[(0.0, 0.0), (0.0, 10.0), (0.05, 10.0), (10.0, 10.0), (10.0, 0.0)]).unwrap();
        let kept = remove_linear_self_intersections(&ring, TOL, 0.0).unwrap();
        assert_eq!(kept[0].point_count(), 5);
        let merged = remove_linear_self_intersections(&ring, TOL, 0.1).unwrap();
        assert_eq!(merged[0].point_count(), 4);
    }

    #[test]
    fn test_simple_ring_is_unchanged() {
        let ring = Curve::ring_xy(&[(0.0, 0.0), (0.0, 10.0), (10.0, 10.0), (10.0, 0.0)]).unwrap();
        let rings = remove_linear_self_intersections(&ring, TOL, 0.0).unwrap();
        assert_eq!(rings.len(), 1);
        assert!(rings[0].equals_xy(&ring, TOL));
    }

    #[test]
    fn test_open_curve_rejected() {
        let line = Curve::open_xy(&[(0.0, 0.0), (5.0, 0.0)]).unwrap();
        assert_eq!(
            remove_linear_self_intersections(&line, TOL, 0.0),
            Err(TopologyError::NotClosed)
        );
    }
}
