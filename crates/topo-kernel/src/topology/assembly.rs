//! Chaining kept subcurves into closed rings.
//!
//! Each kept subcurve becomes a directed edge between two nodes. Rings are
//! traced by always leaving a node along the edge that turns furthest to
//! the right, which keeps every traced ring free of crossings and puts the
//! kept area on its right-hand side.

use std::f64::consts::TAU;

use tracing::{debug, trace};

use crate::config::OverlayConfig;
use crate::geometry::ring_group::ring_lies_within;
use crate::geometry::{Curve, Orientation, Point3d};

use super::navigator::Subcurve;

/// A directed piece of boundary between two nodes.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Edge {
    pub points: Vec<Point3d>,
    pub from: usize,
    pub to: usize,
}

impl Edge {
    /// `None` for a node-less ring, which needs no tracing.
    pub(crate) fn from_subcurve(subcurve: &Subcurve, reversed: bool) -> Option<Self> {
        let (from, to) = (subcurve.from_node?, subcurve.to_node?);
        let mut points = subcurve.points.clone();
        if reversed {
            points.reverse();
            Some(Self { points, from: to, to: from })
        } else {
            Some(Self { points, from, to })
        }
    }

    fn is_twin_of(&self, other: &Edge) -> bool {
        self.from == other.to
            && self.to == other.from
            && self.points.len() == other.points.len()
            && self.points.iter().zip(other.points.iter().rev()).all(|(a, b)| a == b)
    }
}

/// Counter-clockwise angle from the direction back along `incoming` to the
/// direction of `outgoing` at their shared node. Going straight back is a
/// full turn, so it loses to every other choice.
fn turn_angle(incoming: &Edge, outgoing: &Edge, tolerance: f64) -> f64 {
    let Some(&node) = incoming.points.last() else {
        return TAU;
    };
    let back = incoming
        .points
        .iter()
        .rev()
        .skip(1)
        .find(|p| !p.equals_xy(&node, tolerance))
        .or(incoming.points.first());
    let out = outgoing
        .points
        .iter()
        .skip(1)
        .find(|p| !p.equals_xy(&node, tolerance))
        .or(outgoing.points.last());
    let (Some(back), Some(out)) = (back, out) else {
        return TAU;
    };
    let angle = ((*out - node).angle_xy() - (*back - node).angle_xy()).rem_euclid(TAU);
    if angle < 1e-12 { TAU } else { angle }
}

/// Drop edges leading into or out of a node that nothing else reaches. A
/// dangling edge and its reverse twin are removed together.
pub(crate) fn prune_dangles(mut edges: Vec<Edge>, node_count: usize) -> Vec<Edge> {
    loop {
        let mut incoming = vec![0usize; node_count];
        let mut outgoing = vec![0usize; node_count];
        for e in &edges {
            outgoing[e.from] += 1;
            incoming[e.to] += 1;
        }
        let dead_end = |e: &Edge| {
            let twin_back = edges.iter().any(|o| o.is_twin_of(e));
            let spare = usize::from(twin_back);
            outgoing[e.to] <= spare || incoming[e.from] <= spare
        };
        let before = edges.len();
        let keep: Vec<bool> = edges.iter().map(|e| !dead_end(e)).collect();
        let mut flags = keep.into_iter();
        edges.retain(|_| flags.next().unwrap_or(true));
        if edges.len() == before {
            return edges;
        }
        trace!(removed = before - edges.len(), "dangling edges pruned");
    }
}

/// Follow edges into closed point loops, each edge used once.
pub(crate) fn trace_rings(edges: &[Edge], node_count: usize, tolerance: f64) -> Vec<Vec<Point3d>> {
    let mut leaving: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    for (i, e) in edges.iter().enumerate() {
        leaving[e.from].push(i);
    }

    let mut used = vec![false; edges.len()];
    let mut rings = Vec::new();
    for start in 0..edges.len() {
        if used[start] {
            continue;
        }
        used[start] = true;
        let mut chain = vec![start];
        let mut current = start;
        loop {
            let next = leaving[edges[current].to]
                .iter()
                .copied()
                .filter(|&e| e == start || !used[e])
                .map(|e| (turn_angle(&edges[current], &edges[e], tolerance), e != start, e))
                .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2)));
            match next {
                None => {
                    trace!(edges = chain.len(), "open chain abandoned");
                    break;
                }
                Some((_, _, e)) if e == start => {
                    rings.push(join_chain(edges, &chain));
                    break;
                }
                Some((_, _, e)) => {
                    used[e] = true;
                    chain.push(e);
                    current = e;
                }
            }
        }
    }
    debug!(edges = edges.len(), rings = rings.len(), "rings traced");
    rings
}

fn join_chain(edges: &[Edge], chain: &[usize]) -> Vec<Point3d> {
    let mut points: Vec<Point3d> = Vec::new();
    for &i in chain {
        let skip = usize::from(!points.is_empty());
        points.extend(edges[i].points.iter().skip(skip));
    }
    // The chain ends where it started.
    points.pop();
    points
}

/// Turn raw point loops into valid rings: consecutive duplicates and
/// segments shorter than the configured minimum are merged, rings without
/// area are dropped.
pub(crate) fn finish_rings(loops: Vec<Vec<Point3d>>, config: &OverlayConfig) -> Vec<Curve> {
    let tolerance = config.tolerance;
    loops
        .into_iter()
        .filter_map(|points| {
            let mut ring = Curve::ring_with_tolerance(points, tolerance).ok()?;
            ring.remove_duplicate_points(tolerance.max(config.min_segment_length));
            if ring.point_count() < 3 || ring.is_degenerate_ring(tolerance) {
                trace!(area = ring.signed_area_xy(), "sliver ring dropped");
                return None;
            }
            Some(ring)
        })
        .collect()
}

/// Reconcile the traced rings with the boundary loops of the inputs.
///
/// A ring that touches itself at a location other than `preserved` is cut
/// there into separate rings, so a loop enclosing a hole becomes an
/// exterior plus a hole. At the `preserved` locations, rings that the
/// tracing left apart are joined again: a hole touching its exterior, or
/// two exteriors touching from outside.
pub(crate) fn resolve_boundary_loops(rings: Vec<Curve>, preserved: &[Point3d], tolerance: f64) -> Vec<Curve> {
    let before = rings.len();
    let mut rings: Vec<Curve> = rings
        .into_iter()
        .flat_map(|ring| split_at_touches(ring, preserved, tolerance))
        .collect();
    let split = rings.len().saturating_sub(before);

    let mut joined = 0usize;
    while let Some((keep, absorbed, spliced)) = find_splice(&rings, preserved, tolerance) {
        rings[keep] = spliced;
        rings.remove(absorbed);
        joined += 1;
    }
    if split > 0 || joined > 0 {
        debug!(split, joined, "boundary loops reconciled");
    }
    rings
}

pub(crate) fn split_at_touches(ring: Curve, preserved: &[Point3d], tolerance: f64) -> Vec<Curve> {
    let is_preserved = |p: &Point3d| preserved.iter().any(|q| q.equals_xy(p, tolerance));
    let mut pending = vec![ring.into_points()];
    let mut done = Vec::new();
    while let Some(points) = pending.pop() {
        let repeat = (0..points.len()).find_map(|i| {
            if is_preserved(&points[i]) {
                return None;
            }
            (i + 1..points.len())
                .find(|&j| points[i].equals_xy(&points[j], tolerance))
                .map(|j| (i, j))
        });
        match repeat {
            Some((i, j)) => {
                let mut outer = points[..i].to_vec();
                outer.extend_from_slice(&points[j..]);
                pending.push(points[i..j].to_vec());
                pending.push(outer);
            }
            None => {
                // Out-and-back spikes leave fewer than three vertices.
                if let Ok(ring) = Curve::ring(points) {
                    if !ring.is_degenerate_ring(tolerance) {
                        done.push(ring);
                    }
                }
            }
        }
    }
    done
}

fn find_splice(rings: &[Curve], preserved: &[Point3d], tolerance: f64) -> Option<(usize, usize, Curve)> {
    let vertex_of = |ring: &Curve, node: &Point3d| {
        ring.points().iter().position(|p| p.equals_xy(node, tolerance))
    };
    for node in preserved {
        for (o, outer) in rings.iter().enumerate() {
            if outer.orientation() != Orientation::Clockwise {
                continue;
            }
            let Some(ok) = vertex_of(outer, node) else {
                continue;
            };
            for (i, inner) in rings.iter().enumerate() {
                if i == o {
                    continue;
                }
                let Some(ik) = vertex_of(inner, node) else {
                    continue;
                };
                let fits = match inner.orientation() {
                    Orientation::CounterClockwise => ring_lies_within(inner, outer, tolerance),
                    Orientation::Clockwise => {
                        !ring_lies_within(inner, outer, tolerance)
                            && !ring_lies_within(outer, inner, tolerance)
                    }
                    Orientation::Undefined => false,
                };
                if !fits {
                    continue;
                }
                if let Ok(ring) = Curve::ring(splice(outer.points(), ok, inner.points(), ik)) {
                    return Some((o, i, ring));
                }
            }
        }
    }
    None
}

/// `outer` up to vertex `ok`, then all of `inner` starting and ending at
/// vertex `ik`, then the rest of `outer`.
fn splice(outer: &[Point3d], ok: usize, inner: &[Point3d], ik: usize) -> Vec<Point3d> {
    let mut points = Vec::with_capacity(outer.len() + inner.len() + 1);
    points.extend_from_slice(&outer[..=ok]);
    points.extend_from_slice(&inner[ik + 1..]);
    points.extend_from_slice(&inner[..ik]);
    points.push(outer[ok]);
    points.extend_from_slice(&outer[ok + 1..]);
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(coords: &[(f64, f64)], from: usize, to: usize) -> Edge {
        Edge {
            points: coords.iter().map(|&(x, y)| Point3d::xy(x, y)).collect(),
            from,
            to,
        }
    }

    #[test]
    fn test_rightmost_turn_keeps_rings_simple() {
        // Two squares sharing the node at (1, 1), as a figure eight.
        let edges = vec![
            edge(&[(1.0, 1.0), (0.0, 1.0), (0.0, 2.0), (1.0, 2.0), (1.0, 1.0)], 0, 0),
            edge(&[(1.0, 1.0), (2.0, 1.0), (2.0, 0.0), (1.0, 0.0), (1.0, 1.0)], 0, 0),
        ];
        let rings = trace_rings(&edges, 1, 0.01);
        assert_eq!(rings.len(), 2);
        assert!(rings.iter().all(|r| r.len() == 4));
    }

    #[test]
    fn test_trace_two_edges_into_one_ring() {
        let edges = vec![
            edge(&[(0.0, 0.0), (0.0, 2.0), (2.0, 2.0)], 0, 1),
            edge(&[(2.0, 2.0), (2.0, 0.0), (0.0, 0.0)], 1, 0),
        ];
        let rings = trace_rings(&edges, 2, 0.01);
        assert_eq!(rings.len(), 1);
        let ring = Curve::ring(rings[0].clone()).unwrap();
        assert!((ring.signed_area_xy() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_prune_dangles_removes_spur_and_twin() {
        let ring_a = edge(&[(0.0, 0.0), (0.0, 2.0), (2.0, 2.0)], 0, 1);
        let ring_b = edge(&[(2.0, 2.0), (2.0, 0.0), (0.0, 0.0)], 1, 0);
        let spur = edge(&[(2.0, 2.0), (1.0, 1.0)], 1, 2);
        let mut back = spur.clone();
        back.points.reverse();
        back.from = 2;
        back.to = 1;
        let pruned = prune_dangles(vec![ring_a.clone(), ring_b.clone(), spur, back], 3);
        assert_eq!(pruned, vec![ring_a, ring_b]);
    }

    #[test]
    fn test_finish_drops_slivers() {
        let config = OverlayConfig::default();
        let sliver = vec![Point3d::xy(0.0, 0.0), Point3d::xy(5.0, 0.001), Point3d::xy(10.0, 0.0)];
        let square = vec![
            Point3d::xy(0.0, 0.0),
            Point3d::xy(0.0, 1.0),
            Point3d::xy(1.0, 1.0),
            Point3d::xy(1.0, 0.0),
            Point3d::xy(1.0, 0.0),
        ];
        let rings = finish_rings(vec![sliver, square], &config);
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].point_count(), 4);
    }

    #[test]
    fn test_preserved_touch_rejoins_hole() {
        let outer = Curve::ring_xy(&[(0.0, 0.0), (0.0, 10.0), (10.0, 10.0), (10.0, 0.0), (5.0, 0.0)]).unwrap();
        let hole = Curve::ring_xy(&[(5.0, 0.0), (6.0, 2.0), (4.0, 2.0)]).unwrap();
        assert_eq!(hole.orientation(), Orientation::CounterClockwise);
        let rings = resolve_boundary_loops(vec![outer, hole], &[Point3d::xy(5.0, 0.0)], 0.01);
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].point_count(), 8);
        assert!((rings[0].signed_area_xy() - 98.0).abs() < 1e-9);
    }

    #[test]
    fn test_unpreserved_touch_splits_loop() {
        let looped = Curve::ring_xy(&[
            (0.0, 0.0),
            (0.0, 10.0),
            (10.0, 10.0),
            (10.0, 0.0),
            (5.0, 0.0),
            (6.0, 2.0),
            (4.0, 2.0),
            (5.0, 0.0),
        ])
        .unwrap();
        let mut rings = resolve_boundary_loops(vec![looped.clone()], &[], 0.01);
        rings.sort_by(|a, b| a.signed_area_xy().total_cmp(&b.signed_area_xy()));
        assert_eq!(rings.len(), 2);
        assert!((rings[0].signed_area_xy() + 2.0).abs() < 1e-9);
        assert!((rings[1].signed_area_xy() - 100.0).abs() < 1e-9);

        let kept = resolve_boundary_loops(vec![looped], &[Point3d::xy(5.0, 0.0)], 0.01);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn test_spike_is_removed() {
        let spiked = Curve::ring_xy(&[(0.0, 0.0), (0.0, 4.0), (2.0, 4.0), (2.0, 7.0), (2.0, 4.0), (4.0, 4.0), (4.0, 0.0)]).unwrap();
        let rings = resolve_boundary_loops(vec![spiked], &[], 0.01);
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].point_count(), 5);
        assert!((rings[0].signed_area_xy() - 16.0).abs() < 1e-9);
    }
}
