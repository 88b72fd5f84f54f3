//! Per-call configuration for the overlay operations.
//!
//! Nothing here is global: every operation receives its configuration as an
//! explicit value.

use serde::{Deserialize, Serialize};

use crate::error::{check_tolerance, Result};

/// What to do where an input ring touches itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LoopPolicy {
    /// Keep the input's own ring connectivity at self-touch points, so a
    /// hole touching the exterior stays a hole ("Esri style").
    #[default]
    PreserveInputLoops,
    /// Resolve every touch point by the angular rule alone, splitting
    /// boundary loops into separate rings ("OGC style").
    SplitLoops,
}

/// Settings shared by union, intersection, difference and cut.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlayConfig {
    /// XY tolerance: vertices and segments closer than this coincide.
    pub tolerance: f64,
    pub loop_policy: LoopPolicy,
    /// Result segments shorter than this are merged into their neighbours.
    /// Zero keeps every vertex.
    pub min_segment_length: f64,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            tolerance: 0.01,
            loop_policy: LoopPolicy::PreserveInputLoops,
            min_segment_length: 0.0,
        }
    }
}

impl OverlayConfig {
    pub fn with_tolerance(tolerance: f64) -> Self {
        Self {
            tolerance,
            ..Self::default()
        }
    }

    /// Boundary loops of the inputs survive in the result.
    pub fn esri_style() -> Self {
        Self {
            loop_policy: LoopPolicy::PreserveInputLoops,
            ..Self::default()
        }
    }

    /// Boundary loops are split into separate simple rings.
    pub fn ogc_style() -> Self {
        Self {
            loop_policy: LoopPolicy::SplitLoops,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        check_tolerance(self.tolerance)?;
        check_tolerance(self.min_segment_length)
    }
}
