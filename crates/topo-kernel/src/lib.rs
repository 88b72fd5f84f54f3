pub mod config;
pub mod error;
pub mod geometry;
pub mod ring_operator;
pub mod solid;
pub mod topology;
pub mod validation;

pub use config::{LoopPolicy, OverlayConfig};
pub use error::{Result, TopologyError};
pub use geometry::{
    Curve, Envelope, Linear, MultiCurve, MultiPoint, Orientation, Plane3d, Point3d,
    PointLocation, RingGroup, Segment, Shape, Vec3,
};
pub use ring_operator::RingOperator;
pub use solid::{Footprint, Solid};

/// Tolerances for geometric comparisons, passed explicitly to every call.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Tolerance {
    /// Points closer than this in X/Y are coincident.
    pub xy: f64,
    /// Defined Z values closer than this are equal.
    pub z: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self { xy: 0.01, z: 0.01 }
    }
}

impl Tolerance {
    pub fn new(xy: f64, z: f64) -> Result<Self> {
        error::check_tolerance(xy)?;
        error::check_tolerance(z)?;
        Ok(Self { xy, z })
    }

    /// Same XY tolerance for Z.
    pub fn uniform(tolerance: f64) -> Result<Self> {
        Self::new(tolerance, tolerance)
    }

    pub fn points_coincident_xy(&self, a: &Point3d, b: &Point3d) -> bool {
        a.equals_xy(b, self.xy)
    }

    pub fn points_coincident(&self, a: &Point3d, b: &Point3d) -> bool {
        a.equals_xyz(b, self.xy, self.z)
    }

    pub fn is_zero_length(&self, length: f64) -> bool {
        length.abs() <= self.xy
    }

    /// True unless both Z values are defined and further apart than `z`.
    pub fn z_compatible(&self, a: f64, b: f64) -> bool {
        a.is_nan() || b.is_nan() || (a - b).abs() <= self.z
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tolerance() {
        let tol = Tolerance::default();
        assert_eq!(tol.xy, 0.01);
        assert!(tol.points_coincident_xy(&Point3d::xy(0.0, 0.0), &Point3d::xy(0.005, 0.005)));
        assert!(!tol.points_coincident(&Point3d::new(0.0, 0.0, 0.0), &Point3d::new(0.0, 0.0, 1.0)));
        assert!(tol.z_compatible(f64::NAN, 4.0));
    }

    #[test]
    fn test_invalid_tolerance_rejected() {
        assert_eq!(Tolerance::new(-1.0, 0.0), Err(TopologyError::InvalidTolerance(-1.0)));
        assert!(Tolerance::uniform(f64::NAN).is_err());
    }
}
