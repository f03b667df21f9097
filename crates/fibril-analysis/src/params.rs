//! Analyzer configuration.

use fibril_core::{FibrilError, Result};
use fibril_filters::CannyParams;
use serde::{Deserialize, Serialize};

use crate::breadth::EdgePairParams;

/// How the local breadth of a coordinate is measured.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum BreadthStrategy {
    /// Walk the rounded perpendicular in both directions until an edge pixel.
    RayCast,
    /// Distance between the nearest edge pixels on either side of the ridge.
    EdgePair(EdgePairParams),
}

/// Settings of the feature analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerParams {
    /// Breadth method, `None` to skip breadth entirely.
    pub breadth: Option<BreadthStrategy>,
    /// Compute cumulative length.
    pub length: bool,
    /// Robust score above which a breadth is an outlier (default: 3.5).
    pub mad_threshold: f32,
    /// Edge detector used by the default provider.
    pub canny: CannyParams,
}

impl Default for AnalyzerParams {
    fn default() -> Self {
        Self {
            breadth: Some(BreadthStrategy::RayCast),
            length: true,
            mad_threshold: 3.5,
            canny: CannyParams::default(),
        }
    }
}

impl AnalyzerParams {
    pub fn validate(&self) -> Result<()> {
        if !self.mad_threshold.is_finite() || self.mad_threshold <= 0.0 {
            return Err(FibrilError::InvalidParameter(format!(
                "mad_threshold must be finite and positive, got {}",
                self.mad_threshold
            )));
        }
        if let Some(BreadthStrategy::EdgePair(pair)) = self.breadth {
            pair.validate()?;
        }
        self.canny.validate()
    }
}
