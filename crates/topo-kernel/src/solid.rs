//! Solids as plain sets of planar facets, and their footprint on the XY
//! plane.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::{check_tolerance, Result};
use crate::geometry::{Curve, MultiCurve, Plane3d, Point3d, RingGroup};
use crate::topology::operations::union_xy;
use crate::topology::ring3d::{intersect_rings_3d, IntersectionPath3D};

/// A set of planar polygons in space. Facets share no topology; two facets
/// meet wherever their geometry says they do.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Solid {
    facets: Vec<RingGroup>,
}

/// The area a solid covers seen from above.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    /// Clockwise exteriors and counter-clockwise holes, Z undefined.
    pub outline: MultiCurve,
    /// Indices of facets standing upright, which cover no area.
    pub vertical_facets: Vec<usize>,
}

impl Footprint {
    pub fn area_xy(&self) -> f64 {
        self.outline.area_xy()
    }
}

impl Solid {
    pub fn new(facets: Vec<RingGroup>) -> Self {
        Self { facets }
    }

    pub fn facets(&self) -> &[RingGroup] {
        &self.facets
    }

    pub fn facet_count(&self) -> usize {
        self.facets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facets.is_empty()
    }

    pub fn push(&mut self, facet: RingGroup) {
        self.facets.push(facet);
    }

    /// Planes through each facet's exterior, in facet order.
    pub fn facet_planes(&self) -> Result<Vec<Plane3d>> {
        self.facets.iter().map(|f| Plane3d::from_ring(f.exterior())).collect()
    }

    /// Facets whose projection has no area at `tolerance`.
    pub fn vertical_facets(&self, tolerance: f64) -> Vec<usize> {
        self.facets
            .iter()
            .enumerate()
            .filter(|(_, f)| f.is_vertical_within(tolerance))
            .map(|(i, _)| i)
            .collect()
    }

    /// Union of every facet projected to XY. Upright facets take no part in
    /// the union and are listed separately.
    #[instrument(skip(self), fields(facets = self.facets.len()))]
    pub fn footprint(&self, tolerance: f64) -> Result<Footprint> {
        check_tolerance(tolerance)?;
        let vertical_facets = self.vertical_facets(tolerance);
        let mut outline: Option<MultiCurve> = None;
        for (i, facet) in self.facets.iter().enumerate() {
            if vertical_facets.contains(&i) {
                continue;
            }
            let projected = flatten(facet)?;
            outline = Some(match outline {
                None => projected.into_multicurve(),
                Some(current) => union_xy(&current, &projected, tolerance)?,
            });
            debug!(facet = i, "facet added to footprint");
        }
        let outline = outline.unwrap_or_default();
        info!(
            rings = outline.part_count(),
            area = outline.area_xy(),
            vertical = vertical_facets.len(),
            "footprint complete"
        );
        Ok(Footprint {
            outline,
            vertical_facets,
        })
    }

    /// Where two facets' exteriors meet in space.
    pub fn facet_intersections(&self, a: usize, b: usize, tolerance: f64) -> Result<Vec<IntersectionPath3D>> {
        intersect_rings_3d(self.facets[a].exterior(), self.facets[b].exterior(), tolerance)
    }
}

impl FromIterator<RingGroup> for Solid {
    fn from_iter<I: IntoIterator<Item = RingGroup>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

fn flatten(facet: &RingGroup) -> Result<RingGroup> {
    let drop_z = |ring: &Curve| Curve::ring(ring.points().iter().map(|p| Point3d::xy(p.x, p.y)).collect());
    RingGroup::new(
        drop_z(facet.exterior())?,
        facet.interiors().iter().map(drop_z).collect::<Result<Vec<_>>>()?,
    )
}
