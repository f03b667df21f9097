//! Median-absolute-deviation outlier rejection for breadths.

use fibril_core::stats::{mean, mean_absolute_deviation, median, median_absolute_deviation};
use fibril_core::BreadthSummary;

/// Rescales a mean absolute deviation to the MAD scale of a normal distribution.
pub const MEAN_TO_MEDIAN_DEVIATION: f32 = 0.8453;

/// Flag each breadth whose robust score `|b - median| / scale` exceeds `threshold`.
///
/// The scale is the MAD, or the rescaled mean absolute deviation when the MAD
/// is zero. When both are zero nothing is flagged.
pub fn flag_outliers(breadths: &[f32], threshold: f32) -> Vec<bool> {
    let Some(center) = median(breadths) else {
        return Vec::new();
    };
    let mut scale = median_absolute_deviation(breadths, center).unwrap_or(0.0);
    if scale <= 0.0 {
        scale = MEAN_TO_MEDIAN_DEVIATION * mean_absolute_deviation(breadths, center).unwrap_or(0.0);
    }
    if scale <= 0.0 {
        return vec![false; breadths.len()];
    }
    breadths
        .iter()
        .map(|b| (b - center).abs() / scale > threshold)
        .collect()
}

/// Summary of the breadths not flagged as outliers.
pub fn summarize_breadths(breadths: &[f32], outliers: &[bool]) -> Option<BreadthSummary> {
    let kept: Vec<f32> = breadths
        .iter()
        .zip(outliers)
        .filter(|(_, &flagged)| !flagged)
        .map(|(&b, _)| b)
        .collect();
    let (min, max) = kept
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &b| (lo.min(b), hi.max(b)));
    Some(BreadthSummary {
        median: median(&kept)?,
        mean: mean(&kept)?,
        min,
        max,
        included: kept.len(),
        excluded: breadths.len() - kept.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_spike_excluded() {
        let breadths = [5.0, 5.0, 5.0, 5.0, 100.0];
        let flags = flag_outliers(&breadths, 3.5);
        assert_eq!(flags, vec![false, false, false, false, true]);

        let summary = summarize_breadths(&breadths, &flags).unwrap();
        assert_eq!(summary.median, 5.0);
        assert_eq!(summary.max, 5.0);
        assert_eq!(summary.included, 4);
        assert_eq!(summary.excluded, 1);
    }

    #[test]
    fn test_spread_values_kept() {
        let breadths = [4.0, 5.0, 6.0, 5.0, 7.0, 4.0];
        assert!(flag_outliers(&breadths, 3.5).iter().all(|f| !f));
    }

    #[test]
    fn test_mad_scale_used_when_nonzero() {
        // median 5, MAD 1: 12 scores 7
        let breadths = [4.0, 5.0, 6.0, 5.0, 12.0];
        assert_eq!(flag_outliers(&breadths, 3.5), vec![false, false, false, false, true]);
        assert_eq!(flag_outliers(&breadths, 8.0), vec![false; 5]);
    }

    #[test]
    fn test_constant_and_empty() {
        assert_eq!(flag_outliers(&[3.0, 3.0, 3.0], 3.5), vec![false; 3]);
        assert!(flag_outliers(&[], 3.5).is_empty());
        assert_eq!(summarize_breadths(&[], &[]), None);
    }
}
