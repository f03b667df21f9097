//! Fibril Analysis - geometric characterization of traced features.
//!
//! Computes per-coordinate cumulative length, local breadth measured against
//! an edge map, samples of auxiliary scalar fields, and a robust per-feature
//! breadth summary.

pub mod analyzer;
pub mod breadth;
pub mod outlier;
pub mod params;

pub use analyzer::{Analyzer, AuxFields};
pub use breadth::{measure_breadths, EdgePairParams};
pub use outlier::{flag_outliers, summarize_breadths};
pub use params::{AnalyzerParams, BreadthStrategy};
