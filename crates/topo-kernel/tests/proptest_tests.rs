//! Property-based tests for overlay invariants using the `proptest` crate.

use proptest::prelude::*;

use topo_kernel::topology::{difference_xy, intersect_xy, union_xy};
use topo_kernel::validation::audit_rings;
use topo_kernel::{Curve, MultiPoint, Plane3d, Point3d};

// ---------------------------------------------------------------------------
// Strategy helpers
// ---------------------------------------------------------------------------

/// Axis-aligned rectangle as (x0, y0, width, height).
fn arb_rect() -> impl Strategy<Value = (f64, f64, f64, f64)> {
    (-100.0f64..100.0, -100.0f64..100.0, 1.0f64..100.0, 1.0f64..100.0)
}

/// Diamond as (centre x, centre y, radius).
fn arb_diamond() -> impl Strategy<Value = (f64, f64, f64)> {
    (-100.0f64..100.0, -100.0f64..100.0, 1.0f64..80.0)
}

fn rect((x0, y0, w, h): (f64, f64, f64, f64)) -> Curve {
    Curve::ring_xy(&[(x0, y0), (x0, y0 + h), (x0 + w, y0 + h), (x0 + w, y0)]).unwrap()
}

fn diamond((cx, cy, r): (f64, f64, f64)) -> Curve {
    Curve::ring_xy(&[(cx, cy + r), (cx + r, cy), (cx, cy - r), (cx - r, cy)]).unwrap()
}

const TOL: f64 = 0.01;

/// Area error allowed for inputs whose vertices may snap by `TOL`.
fn slack(a: &Curve, b: &Curve) -> f64 {
    TOL * (a.length_xy() + b.length_xy()) + 1e-6
}

// ---------------------------------------------------------------------------
// 1. Area conservation: |A u B| = |A| + |B| - |A n B| and
//    |A \ B| + |A n B| = |A|
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn overlay_area_conservation(a in arb_rect(), b in arb_diamond()) {
        let (a, b) = (rect(a), diamond(b));
        let union = union_xy(&a, &b, TOL).unwrap().area_xy();
        let inter = intersect_xy(&a, &b, TOL).unwrap().area_xy();
        let diff = difference_xy(&a, &b, TOL).unwrap().area_xy();
        let eps = slack(&a, &b);
        prop_assert!((union - (a.signed_area_xy() + b.signed_area_xy() - inter)).abs() <= eps,
            "union {} vs {} + {} - {}", union, a.signed_area_xy(), b.signed_area_xy(), inter);
        prop_assert!((diff + inter - a.signed_area_xy()).abs() <= eps,
            "difference {} + intersection {} != {}", diff, inter, a.signed_area_xy());
    }
}

// ---------------------------------------------------------------------------
// 2. Union and intersection are symmetric
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn overlay_symmetry(a in arb_rect(), b in arb_rect()) {
        let (a, b) = (rect(a), rect(b));
        let eps = slack(&a, &b);
        let ab = union_xy(&a, &b, TOL).unwrap().area_xy();
        let ba = union_xy(&b, &a, TOL).unwrap().area_xy();
        prop_assert!((ab - ba).abs() <= eps, "union {} vs {}", ab, ba);
        let ab = intersect_xy(&a, &b, TOL).unwrap().area_xy();
        let ba = intersect_xy(&b, &a, TOL).unwrap().area_xy();
        prop_assert!((ab - ba).abs() <= eps, "intersection {} vs {}", ab, ba);
    }
}

// ---------------------------------------------------------------------------
// 3. Idempotence: A u A = A n A = A, A \ A is empty
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn overlay_idempotence(d in arb_diamond()) {
        let a = diamond(d);
        let eps = slack(&a, &a);
        let area = a.signed_area_xy();
        prop_assert!((union_xy(&a, &a, TOL).unwrap().area_xy() - area).abs() <= eps);
        prop_assert!((intersect_xy(&a, &a, TOL).unwrap().area_xy() - area).abs() <= eps);
        prop_assert!(difference_xy(&a, &a, TOL).unwrap().area_xy().abs() <= eps);
    }
}

// ---------------------------------------------------------------------------
// 4. Start vertex and orientation of the inputs do not matter
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn overlay_ignores_start_and_orientation(a in arb_rect(), b in arb_diamond(), start in 0usize..4) {
        let (a, b) = (rect(a), diamond(b));
        let baseline = union_xy(&a, &b, TOL).unwrap().area_xy();
        let mut moved = a.reversed();
        moved.rotate_start(start);
        let area = union_xy(&moved, &b, TOL).unwrap().area_xy();
        prop_assert!((area - baseline).abs() <= slack(&a, &b), "{} vs {}", area, baseline);
    }
}

// ---------------------------------------------------------------------------
// 5. Union results are valid ring sets
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn union_result_passes_audit(a in arb_rect(), b in arb_rect()) {
        let union = union_xy(&rect(a), &rect(b), TOL).unwrap();
        let audit = audit_rings(&union, TOL);
        prop_assert!(audit.is_valid(), "findings: {:?}", audit.findings);
    }
}

// ---------------------------------------------------------------------------
// 6. Opening and closing a ring keeps its vertices
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn ring_open_close_round_trip(d in arb_diamond()) {
        let ring = diamond(d);
        let mut curve = ring.clone();
        curve.open_ring();
        prop_assert!(!curve.is_closed());
        prop_assert_eq!(curve.points(), ring.points());
        curve.close().unwrap();
        prop_assert_eq!(curve, ring);
    }
}

// ---------------------------------------------------------------------------
// 7. Clustering does not depend on input order
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn clustering_is_order_independent(
        coords in prop::collection::vec((-10.0f64..10.0, -10.0f64..10.0), 1..40),
    ) {
        let points: Vec<Point3d> = coords.iter().map(|&(x, y)| Point3d::xy(x, y)).collect();
        let mut forward = MultiPoint::new(points.clone());
        let mut backward = MultiPoint::new(points.into_iter().rev().collect());
        let removed_forward = forward.cluster_xy(0.5);
        let removed_backward = backward.cluster_xy(0.5);
        prop_assert_eq!(removed_forward, removed_backward);
        prop_assert_eq!(forward.len(), backward.len());
        for (p, q) in forward.points().iter().zip(backward.points()) {
            prop_assert!(p.distance_xy(q) < 1e-9, "{:?} vs {:?}", p, q);
        }
    }
}

// ---------------------------------------------------------------------------
// 8. A fitted plane passes through its points
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn plane_fit_recovers_plane(
        a in -2.0f64..2.0,
        b in -2.0f64..2.0,
        c in -100.0f64..100.0,
    ) {
        let points: Vec<Point3d> = [(0.0, 0.0), (10.0, 0.0), (10.0, 7.0), (3.0, 12.0), (-4.0, 5.0)]
            .iter()
            .map(|&(x, y)| Point3d::new(x, y, a * x + b * y + c))
            .collect();
        let plane = Plane3d::fit(&points).unwrap();
        for p in &points {
            prop_assert!(plane.signed_distance(p).abs() < 1e-6);
        }
        let z = plane.z_at(1.0, 2.0).unwrap();
        prop_assert!((z - (a + 2.0 * b + c)).abs() < 1e-6);
    }
}
