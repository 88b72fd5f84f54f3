use thiserror::Error;

/// Precondition violations raised by geometry constructors and queries.
///
/// Empty or degenerate results (disjoint inputs, a cut that separates
/// nothing) are not errors; they come back as empty containers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TopologyError {
    #[error("At least {required} points are required, got {actual}")]
    TooFewPoints { required: usize, actual: usize },

    #[error("Operation requires a closed ring")]
    NotClosed,

    #[error("Plane is undefined: the points are collinear or coincident")]
    UndefinedPlane,

    #[error("Cannot compute Z at ({x}, {y}) on a vertical plane")]
    VerticalPlane { x: f64, y: f64 },

    #[error("Geometry has no parts")]
    EmptyGeometry,

    #[error("Tolerance must be finite and non-negative, got {0}")]
    InvalidTolerance(f64),
}

pub type Result<T> = std::result::Result<T, TopologyError>;

/// Reject NaN, infinite or negative tolerances.
pub(crate) fn check_tolerance(tolerance: f64) -> Result<()> {
    if tolerance.is_finite() && tolerance >= 0.0 {
        Ok(())
    } else {
        Err(TopologyError::InvalidTolerance(tolerance))
    }
}
