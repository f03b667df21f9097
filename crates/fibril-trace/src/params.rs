//! Tracer configuration.

use fibril_core::{FibrilError, Result};
use serde::{Deserialize, Serialize};

/// Sensitivity, length and gap settings of the ridge tracer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracerParams {
    /// Boxcar width of the band-pass low-pass stage (default: 4).
    pub nsm1: usize,
    /// Minimum curvature radius in pixels, also the look-ahead length (default: 45).
    pub rmin: usize,
    /// Minimum feature length in pixels (default: 35).
    pub lmin: f32,
    /// Maximum number of seed iterations (default: 2000).
    pub nstruc: usize,
    /// Largest gap in pixels a trace may bridge (default: 1).
    pub ngap: usize,
    /// Base level as a multiple of the median positive intensity (default: 0).
    pub qthresh1: f32,
    /// Seed threshold as a multiple of the median positive filtered value (default: 3).
    pub qthresh2: f32,
    /// Step budget of one trace direction (default: 2000).
    pub max_steps: usize,
}

impl Default for TracerParams {
    fn default() -> Self {
        Self {
            nsm1: 4,
            rmin: 45,
            lmin: 35.0,
            nstruc: 2000,
            ngap: 1,
            qthresh1: 0.0,
            qthresh2: 3.0,
            max_steps: 2000,
        }
    }
}

impl TracerParams {
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(FibrilError::InvalidParameter(msg));
        if self.nsm1 == 0 {
            return invalid("nsm1 must be at least 1".into());
        }
        if self.rmin < 2 {
            return invalid(format!("rmin must be at least 2, got {}", self.rmin));
        }
        if !self.lmin.is_finite() || self.lmin < 1.0 {
            return invalid(format!("lmin must be at least 1, got {}", self.lmin));
        }
        if self.nstruc == 0 || self.max_steps == 0 {
            return invalid("nstruc and max_steps must be at least 1".into());
        }
        for (name, value) in [("qthresh1", self.qthresh1), ("qthresh2", self.qthresh2)] {
            if !value.is_finite() || value < 0.0 {
                return invalid(format!("{} must be finite and non-negative, got {}", name, value));
            }
        }
        Ok(())
    }

    /// Width of the zeroed border around the filtered image.
    pub fn border(&self) -> usize {
        self.nsm1 + 2
    }

    /// Half-width of the square erased around every traced point.
    pub fn erase_half_width(&self) -> usize {
        ((self.nsm1 + 2) / 2).saturating_sub(1).max(1)
    }

    /// Smallest image extent the band-pass border leaves room in.
    pub fn min_extent(&self) -> usize {
        2 * self.border() + 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let params = TracerParams::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.border(), 6);
        assert_eq!(params.erase_half_width(), 2);
        assert_eq!(TracerParams { nsm1: 1, ..params }.erase_half_width(), 1);
    }

    #[test]
    fn test_rejects_out_of_range() {
        let base = TracerParams::default();
        assert!(TracerParams { nsm1: 0, ..base }.validate().is_err());
        assert!(TracerParams { rmin: 1, ..base }.validate().is_err());
        assert!(TracerParams { lmin: f32::NAN, ..base }.validate().is_err());
        assert!(TracerParams { qthresh2: -1.0, ..base }.validate().is_err());
        assert!(TracerParams { max_steps: 0, ..base }.validate().is_err());
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let params: TracerParams = serde_json::from_str(r#"{"rmin": 15, "lmin": 10}"#).unwrap();
        assert_eq!(params.rmin, 15);
        assert_eq!(params.lmin, 10.0);
        assert_eq!(params.nstruc, 2000);
    }
}
