//! Per-pair convenience wrapper over the overlay operations.

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::config::OverlayConfig;
use crate::error::Result;
use crate::geometry::{MultiCurve, RingGroup};
use crate::topology::operations::{intersect_lines_xy, overlay_groups_xy, overlay_xy, OverlayOp};
use crate::topology::predicates;

/// Two polygons and the configuration to combine them with. Every
/// operation reads the stored polygons; none modifies them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RingOperator {
    source: RingGroup,
    target: RingGroup,
    config: OverlayConfig,
}

impl RingOperator {
    pub fn new(source: RingGroup, target: RingGroup, config: OverlayConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { source, target, config })
    }

    pub fn source(&self) -> &RingGroup {
        &self.source
    }

    pub fn target(&self) -> &RingGroup {
        &self.target
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    /// Exchange source and target.
    pub fn swapped(&self) -> Self {
        Self {
            source: self.target.clone(),
            target: self.source.clone(),
            config: self.config,
        }
    }

    pub fn union(&self) -> Result<MultiCurve> {
        self.run(OverlayOp::Union)
    }

    pub fn intersect(&self) -> Result<MultiCurve> {
        self.run(OverlayOp::Intersection)
    }

    /// Source minus target.
    pub fn difference(&self) -> Result<MultiCurve> {
        self.run(OverlayOp::Difference)
    }

    pub fn union_groups(&self) -> Result<Vec<RingGroup>> {
        self.run_grouped(OverlayOp::Union)
    }

    pub fn intersect_groups(&self) -> Result<Vec<RingGroup>> {
        self.run_grouped(OverlayOp::Intersection)
    }

    pub fn difference_groups(&self) -> Result<Vec<RingGroup>> {
        self.run_grouped(OverlayOp::Difference)
    }

    /// Boundary stretches the two polygons share.
    pub fn shared_boundary(&self) -> Result<MultiCurve> {
        intersect_lines_xy(&self.source, &self.target, self.config.tolerance)
    }

    pub fn touches(&self) -> Result<bool> {
        predicates::touches_xy(&self.source, &self.target, self.config.tolerance)
    }

    pub fn disjoint(&self) -> Result<bool> {
        predicates::disjoint_xy(&self.source, &self.target, self.config.tolerance)
    }

    #[instrument(skip(self))]
    fn run(&self, op: OverlayOp) -> Result<MultiCurve> {
        overlay_xy(&self.source, &self.target, op, &self.config)
    }

    fn run_grouped(&self, op: OverlayOp) -> Result<Vec<RingGroup>> {
        overlay_groups_xy(&self.source, &self.target, op, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Curve;
    use approx::assert_relative_eq;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> RingGroup {
        RingGroup::from_xy(&[(x0, y0), (x0, y1), (x1, y1), (x1, y0)]).unwrap()
    }

    fn operator(a: RingGroup, b: RingGroup) -> RingOperator {
        RingOperator::new(a, b, OverlayConfig::default()).unwrap()
    }

    #[test]
    fn test_area_identities_hold() {
        let op = operator(rect(0.0, 0.0, 100.0, 50.0), rect(60.0, 30.0, 160.0, 80.0));
        let union = op.union().unwrap().area_xy();
        let inter = op.intersect().unwrap().area_xy();
        let diff = op.difference().unwrap().area_xy();
        assert_relative_eq!(inter, 800.0, epsilon = 1e-6);
        assert_relative_eq!(union, 5000.0 + 5000.0 - 800.0, epsilon = 1e-6);
        assert_relative_eq!(diff + inter, 5000.0, epsilon = 1e-6);
    }

    #[test]
    fn test_difference_of_hole_filling_island() {
        let hole = Curve::ring_xy(&[(2.0, 2.0), (8.0, 2.0), (8.0, 8.0), (2.0, 8.0)]).unwrap();
        let frame = RingGroup::new(rect(0.0, 0.0, 10.0, 10.0).exterior().clone(), vec![hole]).unwrap();
        let island = rect(2.0, 2.0, 8.0, 8.0);

        let op = operator(frame.clone(), island.clone());
        let groups = op.difference_groups().unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].interior_count(), 1);
        assert_relative_eq!(groups[0].area_xy(), 64.0, epsilon = 1e-6);

        let union = op.union_groups().unwrap();
        assert_eq!(union.len(), 1);
        assert_relative_eq!(union[0].area_xy(), 100.0, epsilon = 1e-6);

        assert_relative_eq!(op.swapped().difference().unwrap().area_xy(), 36.0, epsilon = 1e-6);
        assert!(op.touches().unwrap());
    }

    #[test]
    fn test_disjoint_pair() {
        let op = operator(rect(0.0, 0.0, 1.0, 1.0), rect(5.0, 5.0, 6.0, 6.0));
        assert!(op.disjoint().unwrap());
        assert!(op.intersect().unwrap().is_empty());
        assert!(op.shared_boundary().unwrap().is_empty());
        assert_eq!(op.union_groups().unwrap().len(), 2);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = OverlayConfig::with_tolerance(f64::NAN);
        assert!(RingOperator::new(rect(0.0, 0.0, 1.0, 1.0), rect(0.0, 0.0, 1.0, 1.0), config).is_err());
    }
}
